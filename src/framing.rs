//! Marker-delimited framing.
//!
//! Messages on the wire are `<payload bytes><EOF>`, where the marker is
//! exactly three ASCII bytes. The marker is assumed never to appear inside
//! a valid payload; a payload that happens to contain it will be misframed.
//! That is a documented protocol limitation, not something this codec
//! detects.

use bytes::{Bytes, BytesMut};

/// End-of-message sentinel appended after every payload.
pub const MARKER: &[u8] = b"EOF";

/// Wrap a payload for transmission: payload bytes followed by the marker.
pub fn frame(payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(payload.len() + MARKER.len());
    buf.extend_from_slice(payload);
    buf.extend_from_slice(MARKER);
    buf.freeze()
}

/// Try to extract a complete message from an accumulation buffer.
///
/// Returns the payload (marker stripped) when the buffer ends with the
/// marker, draining the buffer entirely — the protocol carries one message
/// per connection segment, so nothing may follow the marker. A buffer that
/// is exactly the marker is a valid zero-length message. Anything not
/// ending in the marker yields `None` and leaves the buffer untouched.
pub fn try_extract(inbound: &mut BytesMut) -> Option<Bytes> {
    if inbound.len() < MARKER.len() || !inbound.ends_with(MARKER) {
        return None;
    }
    let message = inbound.split_to(inbound.len() - MARKER.len()).freeze();
    inbound.clear();
    Some(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_appends_marker() {
        assert_eq!(frame(b"hello").as_ref(), b"helloEOF");
        assert_eq!(frame(b"").as_ref(), b"EOF");
    }

    #[test]
    fn test_roundtrip_is_lossless() {
        let mut buf = BytesMut::from(frame(b"ni hao").as_ref());
        let msg = try_extract(&mut buf).unwrap();
        assert_eq!(msg.as_ref(), b"ni hao");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_no_marker_yields_none() {
        let mut buf = BytesMut::from(&b"hello"[..]);
        assert!(try_extract(&mut buf).is_none());
        // Buffer untouched, accumulation continues.
        assert_eq!(buf.as_ref(), b"hello");
    }

    #[test]
    fn test_marker_not_at_end_yields_none() {
        let mut buf = BytesMut::from(&b"aEOFb"[..]);
        assert!(try_extract(&mut buf).is_none());
    }

    #[test]
    fn test_partial_marker_yields_none() {
        let mut buf = BytesMut::from(&b"helloEO"[..]);
        assert!(try_extract(&mut buf).is_none());
    }

    #[test]
    fn test_marker_only_is_empty_message() {
        let mut buf = BytesMut::from(MARKER);
        let msg = try_extract(&mut buf).unwrap();
        assert!(msg.is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_extract_is_idempotent() {
        let mut buf = BytesMut::from(frame(b"once").as_ref());
        assert!(try_extract(&mut buf).is_some());
        assert!(try_extract(&mut buf).is_none());
    }
}
