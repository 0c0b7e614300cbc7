//! Client side: one connection driven by its own small event loop.
//!
//! Connects non-blocking, queues the framed word, and polls with a finite
//! timeout so the loop can notice its registry emptying and exit. Mirrors
//! the server's handling: flush on write readiness, accumulate on read
//! readiness, close once the full reply is in hand.

use crate::config;
use crate::connection::{Connection, Registry};
use crate::handler::{self, ReadOutcome, WriteOutcome};
use crate::poller::{Poller, WAKE_TOKEN};
use crate::shutdown;
use mio::net::TcpStream;
use mio::{Interest, Token};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Poll timeout; between wakeups the loop re-checks for shutdown and for
/// an empty registry.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Resolve the server address, send `word`, and return the transformed
/// reply.
///
/// Returns `Ok(None)` when the server closes before a full reply arrives;
/// any partial marker-less data is discarded.
pub fn run(host: &str, port: u16, word: &str) -> io::Result<Option<String>> {
    let addr = config::resolve_addr(host, port)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    fetch(addr, word)
}

/// Send `word` to the server at `addr` and await the transformed reply.
pub fn fetch(addr: SocketAddr, word: &str) -> io::Result<Option<String>> {
    let session = std::process::id();
    info!(session, server = %addr, "Starting connection");

    let mut poller = Poller::new()?;
    let mut connections = Registry::new(1);
    let stop = AtomicBool::new(false);

    // Non-blocking connect; completion is reported as write readiness.
    let stream = TcpStream::connect(addr)?;
    let mut conn = Connection::new(stream, addr);
    conn.queue(word.as_bytes());

    let conn_id = connections.insert(conn).unwrap();
    {
        let conn = connections.get_mut(conn_id).unwrap();
        poller.register(
            &mut conn.stream,
            Token(conn_id),
            Interest::READABLE | Interest::WRITABLE,
        )?;
    }

    let mut reply = None;

    while !connections.is_empty() {
        if shutdown::requested(&stop) {
            info!(session, "Interrupted, closing");
            break;
        }

        let ready = match poller.wait(Some(POLL_INTERVAL)) {
            Ok(ready) => ready,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        for event in ready {
            let Token(id) = event.token;
            if event.token == WAKE_TOKEN || !connections.contains(id) {
                continue;
            }

            if event.readable {
                let conn = connections.get_mut(id).unwrap();
                match handler::handle_readable(conn) {
                    Ok(ReadOutcome::Message(message)) => {
                        debug!(session, bytes = message.len(), "Received full reply");
                        reply = Some(String::from_utf8_lossy(&message).into_owned());
                        // Reply complete; this side closes first.
                        close(&poller, &mut connections, id, session);
                        continue;
                    }
                    Ok(ReadOutcome::Closed) => {
                        // Server went away; partial data is dropped.
                        close(&poller, &mut connections, id, session);
                        continue;
                    }
                    Ok(ReadOutcome::Pending) => {}
                    Err(e) => {
                        close(&poller, &mut connections, id, session);
                        return Err(e);
                    }
                }
            }

            if event.writable && connections.contains(id) {
                let conn = connections.get_mut(id).unwrap();
                if conn.has_pending_write() {
                    debug!(session, bytes = conn.outbound.len(), "Sending request");
                }
                match handler::handle_writable(conn) {
                    Ok(WriteOutcome::Flushed) => {
                        // Request sent; only the reply matters now.
                        poller.reregister(&mut conn.stream, Token(id), Interest::READABLE)?;
                    }
                    Ok(WriteOutcome::Partial | WriteOutcome::Idle) => {}
                    Err(e) => {
                        // Connect refusal surfaces here as a socket error.
                        warn!(session, error = %e, "Socket error");
                        close(&poller, &mut connections, id, session);
                        return Err(e);
                    }
                }
            }
        }
    }

    Ok(reply)
}

fn close(poller: &Poller, connections: &mut Registry, id: usize, session: u32) {
    if let Some(mut conn) = connections.remove(id) {
        let _ = poller.deregister(&mut conn.stream);
        info!(session, "Closing connection");
    }
}
