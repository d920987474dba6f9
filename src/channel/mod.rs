//! Bounded byte-line channels bridging producers to one transport worker.
//!
//! Every active transport owns exactly one [`Channel`]. Any thread may push
//! into it through the router; only the transport's worker pops. The push side
//! never blocks or allocates: a full channel rejects the line immediately and
//! the rejection is counted on the channel's [`DropCounter`].
//!
//! Two interchangeable backends implement [`LineChannel`]:
//!
//! - [`RingChannel`]: a lock-free `crossbeam-queue` ring with a parked
//!   consumer. Pushing never takes a lock.
//! - [`MessageChannel`]: a `crossbeam-channel` bounded queue. Pushing may
//!   briefly take the channel's internal waker lock to wake a parked
//!   receiver.

mod message;
mod ring;


use std::time::Duration;

use crate::{drop_accounting::DropCounter, log_line::LogLine};

pub use message::MessageChannel;
pub use ring::RingChannel;

/// Result of a non-blocking push.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    Delivered,
    Dropped,
}

/// Selects the queue implementation backing a [`Channel`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChannelBackend {
    /// Lock-free ring buffer (default).
    #[default]
    Ring,
    /// `crossbeam-channel` bounded queue.
    Message,
}

/// Fixed-capacity FIFO of [`LogLine`] values with a single consumer.
///
/// Implementations copy lines in on push and out on pop.
pub trait LineChannel: Send + Sync {
    /// Enqueue a copy of `line` without blocking.
    fn try_push(&self, line: &LogLine) -> PushOutcome;

    /// Block until a line is available and return it.
    fn pop(&self) -> LogLine;

    /// Wait at most `timeout` for a line.
    fn pop_timeout(&self, timeout: Duration) -> Option<LogLine>;

    /// Number of queued lines.
    fn len(&self) -> usize;

    /// Maximum number of queued lines.
    fn capacity(&self) -> usize;
}

/// A [`LineChannel`] paired with its drop counter.
pub struct Channel {
    inner: Box<dyn LineChannel>,
    drops: DropCounter,
}

impl Channel {
    /// Construct a channel holding up to `capacity` lines.
    ///
    /// A zero capacity is raised to one; configuration validation rejects it
    /// before it reaches this point.
    pub fn new(capacity: usize, backend: ChannelBackend) -> Self {
        let capacity = capacity.max(1);
        let inner: Box<dyn LineChannel> = match backend {
            ChannelBackend::Ring => Box::new(RingChannel::new(capacity)),
            ChannelBackend::Message => Box::new(MessageChannel::new(capacity)),
        };
        Self::from_backend(inner)
    }

    /// Wrap a custom backend.
    pub fn from_backend(inner: Box<dyn LineChannel>) -> Self {
        Self {
            inner,
            drops: DropCounter::new(),
        }
    }

    /// Push without blocking, counting the line when it is rejected.
    pub fn push(&self, line: &LogLine) -> PushOutcome {
        let outcome = self.inner.try_push(line);
        if outcome == PushOutcome::Dropped {
            self.drops.increment();
        }
        outcome
    }

    /// Block until a line is queued. Only the owning worker calls this.
    pub fn pop(&self) -> LogLine {
        self.inner.pop()
    }

    /// Like [`pop`](Self::pop), giving up after `timeout`.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<LogLine> {
        self.inner.pop_timeout(timeout)
    }

    /// Lines currently queued.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fixed maximum number of queued lines.
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Lines rejected since the channel was created.
    pub fn dropped(&self) -> u64 {
        self.drops.get()
    }

    /// The counter behind [`dropped`](Self::dropped).
    pub fn drop_counter(&self) -> &DropCounter {
        &self.drops
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("dropped", &self.dropped())
            .finish()
    }
}
