//! Per-channel drop counters and the worker-side drop reporter.
//!
//! Producers bump a [`DropCounter`] with a single relaxed atomic increment
//! whenever a channel rejects a line; no lock is involved, so the counter is
//! safe to touch from any context. The owning worker periodically compares
//! the counter against what it last saw and summarises the difference through
//! a [`RateLimitedWarner`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::warn;

use crate::{rate_limited_warner::RateLimitedWarner, transport::TransportKind};

/// Monotonic count of lines rejected by a full channel.
#[derive(Debug, Default)]
pub struct DropCounter(AtomicU64);

impl DropCounter {
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Turns growth of a [`DropCounter`] into rate-limited warnings.
pub(crate) struct DropReporter {
    kind: TransportKind,
    seen: u64,
    warner: RateLimitedWarner,
}

impl DropReporter {
    pub(crate) fn new(kind: TransportKind, interval: Duration) -> Self {
        Self {
            kind,
            seen: 0,
            warner: RateLimitedWarner::new(interval),
        }
    }

    pub(crate) fn observe(&mut self, counter: &DropCounter) {
        let current = counter.get();
        if current > self.seen {
            self.warner.record_drops(current - self.seen);
            self.seen = current;
        }
        let kind = self.kind;
        self.warner.warn_if_due(|count| {
            warn!("netlog {kind}: {count} log lines dropped because the queue was full");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn concurrent_increments_are_all_counted() {
        let counter = Arc::new(DropCounter::new());
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        counter.increment();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().expect("incrementing thread panicked");
        }
        assert_eq!(counter.get(), 4000);
    }

    #[test]
    fn reporter_tracks_only_new_drops() {
        let counter = DropCounter::new();
        let mut reporter = DropReporter::new(TransportKind::Udp, Duration::ZERO);
        counter.increment();
        counter.increment();
        reporter.observe(&counter);
        assert_eq!(reporter.seen, 2);
        reporter.observe(&counter);
        assert_eq!(reporter.seen, 2);
        counter.increment();
        reporter.observe(&counter);
        assert_eq!(reporter.seen, 3);
    }
}
