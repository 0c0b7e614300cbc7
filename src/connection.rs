//! Per-connection state and the live-connection registry.
//!
//! Each connection owns its socket and two accumulation buffers. The
//! registry maps poll tokens to connections with slab allocation; the token
//! handed to the poller is the slab key.

use crate::framing;
use bytes::BytesMut;
use mio::net::TcpStream;
use slab::Slab;
use std::net::SocketAddr;

/// State for a single TCP connection.
///
/// `inbound` accumulates reads for the current message and is drained the
/// moment a complete message is extracted. `outbound` holds framed bytes
/// waiting to be written; it shrinks from the front as writes succeed.
#[derive(Debug)]
pub struct Connection {
    /// Exclusively owned socket; dropped (closed) with the connection.
    pub stream: TcpStream,
    /// Peer address, for diagnostics only.
    pub peer: SocketAddr,
    /// Bytes received so far for the in-flight message.
    pub inbound: BytesMut,
    /// Framed bytes queued for transmission.
    pub outbound: BytesMut,
}

impl Connection {
    /// Create a connection with empty buffers.
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            stream,
            peer,
            inbound: BytesMut::new(),
            outbound: BytesMut::new(),
        }
    }

    /// Queue a payload for transmission, framed with the end marker.
    pub fn queue(&mut self, payload: &[u8]) {
        self.outbound.extend_from_slice(&framing::frame(payload));
    }

    /// Whether any outbound bytes are waiting to be flushed.
    pub fn has_pending_write(&self) -> bool {
        !self.outbound.is_empty()
    }
}

/// Registry of active connections using slab allocation.
///
/// Provides O(1) insert, lookup, and remove. Owned exclusively by the
/// event loop thread; no synchronization needed.
pub struct Registry {
    connections: Slab<Connection>,
    max_connections: usize,
}

impl Registry {
    /// Create a registry with the given connection cap.
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: Slab::with_capacity(max_connections),
            max_connections,
        }
    }

    /// Insert a new connection, returning its token key.
    ///
    /// Returns `None` if the registry is at capacity.
    pub fn insert(&mut self, conn: Connection) -> Option<usize> {
        if self.connections.len() >= self.max_connections {
            return None;
        }
        Some(self.connections.insert(conn))
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut Connection> {
        self.connections.get_mut(id)
    }

    /// Remove a connection; its socket closes when the returned value drops.
    pub fn remove(&mut self, id: usize) -> Option<Connection> {
        self.connections.try_remove(id)
    }

    pub fn contains(&self, id: usize) -> bool {
        self.connections.contains(id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Drain every connection, for shutdown teardown.
    pub fn drain(&mut self) -> Vec<Connection> {
        self.connections.drain().collect()
    }
}
