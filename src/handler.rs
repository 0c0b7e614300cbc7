//! Non-blocking read/write handling for a single connection.
//!
//! Invoked by the event loops once per readiness event. Both directions
//! treat would-block as ordinary control flow: a read that would block just
//! leaves the inbound buffer accumulating, a short write leaves the
//! remainder queued for the next write-ready event.

use crate::connection::Connection;
use crate::framing;
use bytes::{Buf, Bytes};
use std::io::{self, Read, Write};

/// Bytes requested per receive call.
pub const READ_CHUNK: usize = 1024;

/// Result of servicing a read-ready event.
#[derive(Debug)]
pub enum ReadOutcome {
    /// No complete message yet; keep accumulating.
    Pending,
    /// A complete message was extracted; the inbound buffer is drained.
    Message(Bytes),
    /// Zero-byte read: the peer shut down its send side. Any partial
    /// marker-less data in the inbound buffer is discarded with it.
    Closed,
}

/// Result of servicing a write-ready event.
#[derive(Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Nothing was queued.
    Idle,
    /// The kernel accepted part of the buffer; stay registered for write
    /// readiness and retry on the next event.
    Partial,
    /// The outbound buffer was fully flushed.
    Flushed,
}

/// Read until a complete message, end of stream, or would-block.
///
/// Notifications are edge-triggered, so a ready socket must be drained: a
/// single bounded read could strand bytes in the kernel buffer with no
/// further event coming.
pub fn handle_readable(conn: &mut Connection) -> io::Result<ReadOutcome> {
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match conn.stream.read(&mut chunk) {
            Ok(0) => return Ok(ReadOutcome::Closed),
            Ok(n) => {
                conn.inbound.extend_from_slice(&chunk[..n]);
                if let Some(message) = framing::try_extract(&mut conn.inbound) {
                    return Ok(ReadOutcome::Message(message));
                }
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                return Ok(ReadOutcome::Pending)
            }
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Flush the outbound buffer until empty or would-block.
pub fn handle_writable(conn: &mut Connection) -> io::Result<WriteOutcome> {
    if conn.outbound.is_empty() {
        return Ok(WriteOutcome::Idle);
    }
    loop {
        match conn.stream.write(&conn.outbound) {
            Ok(0) => {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "write returned 0"))
            }
            Ok(n) => {
                conn.outbound.advance(n);
                if conn.outbound.is_empty() {
                    return Ok(WriteOutcome::Flushed);
                }
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                return Ok(WriteOutcome::Partial)
            }
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::net::TcpListener;
    use std::time::{Duration, Instant};

    /// Accepted non-blocking connection plus the peer's blocking socket.
    fn socket_pair() -> (Connection, std::net::TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let peer = std::net::TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (accepted, peer_addr) = listener.accept().unwrap();
        accepted.set_nonblocking(true).unwrap();
        let conn = Connection::new(mio::net::TcpStream::from_std(accepted), peer_addr);
        (conn, peer)
    }

    /// Retry a read until the expected outcome arrives; loopback delivery
    /// is fast but not instantaneous.
    fn read_until<F: Fn(&ReadOutcome) -> bool>(conn: &mut Connection, done: F) -> ReadOutcome {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let outcome = handle_readable(conn).unwrap();
            if done(&outcome) {
                return outcome;
            }
            assert!(Instant::now() < deadline, "timed out waiting for read");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_read_assembles_framed_message() {
        let (mut conn, mut peer) = socket_pair();
        peer.write_all(b"ni haoEOF").unwrap();

        let outcome = read_until(&mut conn, |o| matches!(o, ReadOutcome::Message(_)));
        let ReadOutcome::Message(msg) = outcome else {
            unreachable!()
        };
        assert_eq!(msg.as_ref(), b"ni hao");
        assert!(conn.inbound.is_empty());
    }

    #[test]
    fn test_read_accumulates_across_chunk_boundary() {
        let (mut conn, mut peer) = socket_pair();
        // Framed length exceeds one read chunk, forcing accumulation.
        let payload = vec![b'x'; READ_CHUNK + 200];
        let mut framed = payload.clone();
        framed.extend_from_slice(b"EOF");
        peer.write_all(&framed).unwrap();
        peer.flush().unwrap();

        let outcome = read_until(&mut conn, |o| matches!(o, ReadOutcome::Message(_)));
        let ReadOutcome::Message(msg) = outcome else {
            unreachable!()
        };
        assert_eq!(msg.as_ref(), payload.as_slice());
    }

    #[test]
    fn test_read_pending_without_marker() {
        let (mut conn, mut peer) = socket_pair();
        peer.write_all(b"partial").unwrap();

        // Wait for the bytes to land, then confirm no message is emitted.
        let deadline = Instant::now() + Duration::from_secs(5);
        while conn.inbound.is_empty() {
            assert!(matches!(
                handle_readable(&mut conn).unwrap(),
                ReadOutcome::Pending
            ));
            assert!(Instant::now() < deadline);
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(conn.inbound.as_ref(), b"partial");
    }

    #[test]
    fn test_read_reports_peer_close() {
        let (mut conn, peer) = socket_pair();
        drop(peer);

        let outcome = read_until(&mut conn, |o| matches!(o, ReadOutcome::Closed));
        assert!(matches!(outcome, ReadOutcome::Closed));
    }

    #[test]
    fn test_partial_data_discarded_on_close() {
        let (mut conn, mut peer) = socket_pair();
        peer.write_all(b"half a mess").unwrap();
        peer.flush().unwrap();
        drop(peer);

        // Accumulates the stray bytes, then sees the close; no message.
        let outcome = read_until(&mut conn, |o| matches!(o, ReadOutcome::Closed));
        assert!(matches!(outcome, ReadOutcome::Closed));
    }

    #[test]
    fn test_write_idle_with_empty_buffer() {
        let (mut conn, _peer) = socket_pair();
        assert_eq!(handle_writable(&mut conn).unwrap(), WriteOutcome::Idle);
    }

    #[test]
    fn test_write_flushes_queued_frame() {
        let (mut conn, mut peer) = socket_pair();
        conn.queue(b"hello");
        assert_eq!(handle_writable(&mut conn).unwrap(), WriteOutcome::Flushed);
        assert!(!conn.has_pending_write());

        let mut received = [0u8; 8];
        use std::io::Read as _;
        peer.read_exact(&mut received).unwrap();
        assert_eq!(&received, b"helloEOF");
    }
}
