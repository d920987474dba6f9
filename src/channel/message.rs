//! `crossbeam-channel` backend.

use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::log_line::LogLine;

use super::{LineChannel, PushOutcome};

/// Channel backed by [`crossbeam_channel::bounded`].
pub struct MessageChannel {
    tx: Sender<LogLine>,
    rx: Receiver<LogLine>,
}

impl MessageChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self { tx, rx }
    }
}

impl LineChannel for MessageChannel {
    fn try_push(&self, line: &LogLine) -> PushOutcome {
        match self.tx.try_send(line.clone()) {
            Ok(()) => PushOutcome::Delivered,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                PushOutcome::Dropped
            }
        }
    }

    fn pop(&self) -> LogLine {
        // Both halves live in `self`, so `recv` cannot observe a disconnect;
        // an empty line is skipped by the worker.
        self.rx.recv().unwrap_or_default()
    }

    fn pop_timeout(&self, timeout: Duration) -> Option<LogLine> {
        self.rx.recv_timeout(timeout).ok()
    }

    fn len(&self) -> usize {
        self.rx.len()
    }

    fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(0)
    }
}
