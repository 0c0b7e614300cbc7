//! wordwire: a framed request/response text service over TCP.
//!
//! A client sends one text token, the server transforms it and sends the
//! result back. Messages are delimited by a fixed 3-byte `EOF` marker.
//!
//! The interesting part is the connection layer, not the transform:
//! - Readiness-based model: one thread, non-blocking sockets, a poll call
//!   tells us which sockets are ready before we touch them.
//! - Partial reads and writes are first-class: inbound bytes accumulate per
//!   connection until the marker appears, outbound bytes drain across as
//!   many write-ready events as the kernel requires.
//! - The transform itself is an external collaborator, injected as a plain
//!   `FnMut(&str) -> String` at the server seam.

pub mod client;
pub mod config;
pub mod connection;
pub mod framing;
pub mod handler;
pub mod poller;
pub mod server;
pub mod shutdown;
