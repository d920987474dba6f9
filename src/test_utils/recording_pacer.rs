use std::{sync::Arc, thread, time::Duration};

use parking_lot::Mutex;

use crate::worker::Pacer;

#[derive(Debug, Default)]
struct PacerLog {
    sleeps: Vec<Duration>,
    yields: usize,
}

/// [`Pacer`] that records requested delays instead of honouring them.
///
/// Each sleep still parks the thread for at most one millisecond so a worker
/// spinning on a dead fake network does not monopolise a core.
#[derive(Clone, Debug, Default)]
pub struct RecordingPacer {
    log: Arc<Mutex<PacerLog>>,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delay requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.log.lock().sleeps.clone()
    }

    /// Requested delays in whole milliseconds.
    pub fn sleep_millis(&self) -> Vec<u64> {
        self.log
            .lock()
            .sleeps
            .iter()
            .map(|delay| u64::try_from(delay.as_millis()).unwrap_or(u64::MAX))
            .collect()
    }

    pub fn yields(&self) -> usize {
        self.log.lock().yields
    }

    pub fn clear(&self) {
        let mut log = self.log.lock();
        log.sleeps.clear();
        log.yields = 0;
    }
}

impl Pacer for RecordingPacer {
    fn sleep(&mut self, duration: Duration) {
        self.log.lock().sleeps.push(duration);
        thread::sleep(duration.min(Duration::from_millis(1)));
    }

    fn yield_now(&mut self) {
        self.log.lock().yields += 1;
    }
}
