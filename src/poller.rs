//! Thin wrapper over the OS readiness facility.
//!
//! mio's `Poll` is epoll on Linux and kqueue on macOS. Notifications are
//! edge-triggered, so interest changes go through `reregister` to re-arm a
//! socket, and ready sockets must be drained to would-block.

use mio::event::Source;
use mio::{Events, Interest, Poll, Token, Waker};
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Token reserved for shutdown wakeups.
pub const WAKE_TOKEN: Token = Token(usize::MAX - 1);

/// One readiness notification, decoupled from mio's event buffer so the
/// caller can mutate its registry while iterating.
#[derive(Debug, Clone, Copy)]
pub struct Readiness {
    pub token: Token,
    pub readable: bool,
    pub writable: bool,
}

/// Multiplexer: registers sockets for read/write interest and yields the
/// ones the OS reports ready.
pub struct Poller {
    poll: Poll,
    events: Events,
    waker: Arc<Waker>,
}

impl Poller {
    pub fn new() -> io::Result<Self> {
        let poll = Poll::new()?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKE_TOKEN)?);
        Ok(Self {
            poll,
            events: Events::with_capacity(128),
            waker,
        })
    }

    /// Handle that wakes a blocked `wait` call from another thread.
    pub fn waker(&self) -> Arc<Waker> {
        Arc::clone(&self.waker)
    }

    pub fn register(
        &self,
        source: &mut impl Source,
        token: Token,
        interest: Interest,
    ) -> io::Result<()> {
        self.poll.registry().register(source, token, interest)
    }

    pub fn reregister(
        &self,
        source: &mut impl Source,
        token: Token,
        interest: Interest,
    ) -> io::Result<()> {
        self.poll.registry().reregister(source, token, interest)
    }

    pub fn deregister(&self, source: &mut impl Source) -> io::Result<()> {
        self.poll.registry().deregister(source)
    }

    /// Block until at least one registered socket is ready or the timeout
    /// elapses. `None` blocks indefinitely. This is the loop's sole wait
    /// point; an interrupting signal surfaces as `ErrorKind::Interrupted`.
    pub fn wait(&mut self, timeout: Option<Duration>) -> io::Result<Vec<Readiness>> {
        self.poll.poll(&mut self.events, timeout)?;
        Ok(self
            .events
            .iter()
            .map(|event| Readiness {
                token: event.token(),
                readable: event.is_readable(),
                writable: event.is_writable(),
            })
            .collect())
    }
}
