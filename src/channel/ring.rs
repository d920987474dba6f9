//! Lock-free ring backend.

use std::{
    sync::{
        OnceLock,
        atomic::{self, AtomicBool, Ordering},
    },
    thread::{self, Thread},
    time::{Duration, Instant},
};

use crossbeam_queue::ArrayQueue;

use crate::log_line::LogLine;

use super::{LineChannel, PushOutcome};

/// Ring buffer channel built on [`ArrayQueue`].
///
/// Slots are allocated once at construction. Producers copy into a slot with
/// a CAS and, if the consumer is parked, wake it with [`Thread::unpark`].
pub struct RingChannel {
    queue: ArrayQueue<LogLine>,
    consumer: OnceLock<Thread>,
    waiting: AtomicBool,
}

impl RingChannel {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
            consumer: OnceLock::new(),
            waiting: AtomicBool::new(false),
        }
    }

    /// Must run after the line is in the queue. The fence pairs with the one
    /// in [`park`](Self::park): either this load sees `waiting` or the
    /// consumer's re-check sees the line.
    fn wake_consumer(&self) {
        atomic::fence(Ordering::SeqCst);
        if self.waiting.load(Ordering::SeqCst)
            && let Some(consumer) = self.consumer.get()
        {
            consumer.unpark();
        }
    }

    /// Announce that the consumer is about to park, then re-check the queue
    /// so a push racing with the announcement is not missed.
    ///
    /// `None` parks until a producer unparks the consumer. Spurious wake-ups
    /// return `None` too; callers loop.
    fn park(&self, timeout: Option<Duration>) -> Option<LogLine> {
        self.consumer.get_or_init(thread::current);
        self.waiting.store(true, Ordering::SeqCst);
        atomic::fence(Ordering::SeqCst);
        if let Some(line) = self.queue.pop() {
            self.waiting.store(false, Ordering::SeqCst);
            return Some(line);
        }
        match timeout {
            Some(timeout) => thread::park_timeout(timeout),
            None => thread::park(),
        }
        self.waiting.store(false, Ordering::SeqCst);
        None
    }
}

impl LineChannel for RingChannel {
    fn try_push(&self, line: &LogLine) -> PushOutcome {
        match self.queue.push(line.clone()) {
            Ok(()) => {
                self.wake_consumer();
                PushOutcome::Delivered
            }
            Err(_) => PushOutcome::Dropped,
        }
    }

    fn pop(&self) -> LogLine {
        loop {
            if let Some(line) = self.queue.pop() {
                return line;
            }
            if let Some(line) = self.park(None) {
                return line;
            }
        }
    }

    fn pop_timeout(&self, timeout: Duration) -> Option<LogLine> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(line) = self.queue.pop() {
                return Some(line);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            if let Some(line) = self.park(Some(remaining)) {
                return Some(line);
            }
        }
    }

    fn len(&self) -> usize {
        self.queue.len()
    }

    fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}
