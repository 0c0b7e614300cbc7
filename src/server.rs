//! Server side: acceptor and event loop.
//!
//! Single thread, readiness-based. The loop blocks on the poller with no
//! timeout, accepts on listener events, and services connections on their
//! events: accumulate reads until a complete message, run the transform,
//! queue the framed reply, flush on write readiness, then wait for the
//! peer's close. One connection's failure never stops the loop; only an
//! interrupt or a `ShutdownHandle` does.

use crate::config::ServerConfig;
use crate::connection::{Connection, Registry};
use crate::handler::{self, ReadOutcome, WriteOutcome};
use crate::poller::{Poller, Readiness, WAKE_TOKEN};
use crate::shutdown::{self, ShutdownHandle};
use mio::net::TcpListener;
use mio::{Interest, Token};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const LISTENER_TOKEN: Token = Token(usize::MAX);

/// Server instance owning its listener, poller, and connection registry.
///
/// Lifecycle: `bind` → `run` → teardown. Never a process-wide singleton;
/// tests run several side by side.
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    poller: Poller,
    connections: Registry,
    stop: Arc<AtomicBool>,
}

impl Server {
    /// Bind the listening socket and set up the poller.
    pub fn bind(config: &ServerConfig) -> io::Result<Server> {
        let addr = config
            .listen_addr()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let std_listener = create_listener(addr)?;
        let local_addr = std_listener.local_addr()?;
        let mut listener = TcpListener::from_std(std_listener);

        let poller = Poller::new()?;
        poller.register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;

        Ok(Server {
            listener,
            local_addr,
            poller,
            connections: Registry::new(config.max_connections),
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The bound address; useful when binding port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle that stops the running loop from another thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle::new(Arc::clone(&self.stop), self.poller.waker())
    }

    /// Run until interrupted, applying `transform` to each received word.
    ///
    /// The transform is called synchronously inside the loop; it is assumed
    /// total and fast.
    pub fn run<F>(mut self, mut transform: F) -> io::Result<()>
    where
        F: FnMut(&str) -> String,
    {
        info!(addr = %self.local_addr, "Listening");

        loop {
            if shutdown::requested(&self.stop) {
                break;
            }

            let ready = match self.poller.wait(None) {
                Ok(ready) => ready,
                // A signal interrupted the poll; the flag check above
                // decides whether it was a shutdown request.
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };

            for event in ready {
                match event.token {
                    LISTENER_TOKEN => self.accept_pending()?,
                    WAKE_TOKEN => {}
                    Token(conn_id) => {
                        if let Err(e) = self.service_connection(conn_id, event, &mut transform) {
                            debug!(conn_id, error = %e, "Connection error");
                            self.close_connection(conn_id);
                        }
                    }
                }
            }
        }

        self.teardown();
        Ok(())
    }

    /// Accept every pending connection; the listener is edge-triggered.
    fn accept_pending(&mut self) -> io::Result<()> {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    let conn_id = match self.connections.insert(Connection::new(stream, peer)) {
                        Some(id) => id,
                        None => {
                            // Dropping the stream closes the socket.
                            warn!(%peer, "Connection limit reached, rejecting");
                            continue;
                        }
                    };

                    // Re-borrow after insert
                    let conn = self.connections.get_mut(conn_id).unwrap();
                    self.poller.register(
                        &mut conn.stream,
                        Token(conn_id),
                        Interest::READABLE | Interest::WRITABLE,
                    )?;

                    info!(conn_id, peer = %peer, "Accepted connection");
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!(error = %e, "Accept error");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Service one readiness event: reads first, then writes, both in the
    /// same pass when both are signaled.
    fn service_connection<F>(
        &mut self,
        conn_id: usize,
        event: Readiness,
        transform: &mut F,
    ) -> io::Result<()>
    where
        F: FnMut(&str) -> String,
    {
        // Stale event for a connection closed earlier this cycle.
        if !self.connections.contains(conn_id) {
            return Ok(());
        }

        if event.readable {
            let conn = self.connections.get_mut(conn_id).unwrap();
            match handler::handle_readable(conn)? {
                ReadOutcome::Closed => {
                    info!(conn_id, peer = %conn.peer, "Closing connection");
                    self.close_connection(conn_id);
                    return Ok(());
                }
                ReadOutcome::Message(message) => {
                    let word = String::from_utf8_lossy(&message);
                    let reply = transform(&word);
                    debug!(conn_id, peer = %conn.peer, reply = %reply, "Echoing transform result");
                    conn.queue(reply.as_bytes());
                    // Re-arm for write readiness; the reply flushes below
                    // or on a later event.
                    self.poller.reregister(
                        &mut conn.stream,
                        Token(conn_id),
                        Interest::READABLE | Interest::WRITABLE,
                    )?;
                }
                ReadOutcome::Pending => {}
            }
        }

        if event.writable && self.connections.contains(conn_id) {
            let conn = self.connections.get_mut(conn_id).unwrap();
            match handler::handle_writable(conn)? {
                WriteOutcome::Flushed => {
                    // Reply sent; wait for the peer to close.
                    self.poller
                        .reregister(&mut conn.stream, Token(conn_id), Interest::READABLE)?;
                }
                WriteOutcome::Partial | WriteOutcome::Idle => {}
            }
        }

        Ok(())
    }

    /// Terminal transition: deregister, close, and forget a connection.
    fn close_connection(&mut self, conn_id: usize) {
        if let Some(mut conn) = self.connections.remove(conn_id) {
            let _ = self.poller.deregister(&mut conn.stream);
            debug!(conn_id, "Connection closed");
        }
    }

    /// Best-effort teardown of every open socket.
    fn teardown(&mut self) {
        info!(open = self.connections.len(), "Shutting down");
        for mut conn in self.connections.drain() {
            let _ = self.poller.deregister(&mut conn.stream);
        }
    }
}

/// Create a non-blocking TCP listener with address reuse.
fn create_listener(addr: SocketAddr) -> io::Result<std::net::TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;

    Ok(socket.into())
}
