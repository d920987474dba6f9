use std::{fmt, sync::Arc};

use parking_lot::Mutex;

use crate::router::ConsoleSink;

/// Console that keeps everything written to it in memory.
#[derive(Clone, Default)]
pub struct CollectingConsole {
    buffer: Arc<Mutex<String>>,
}

impl CollectingConsole {
    /// Snapshot of the text written so far.
    pub fn contents(&self) -> String {
        self.buffer.lock().clone()
    }
}

impl ConsoleSink for CollectingConsole {
    fn write_fmt(&self, args: fmt::Arguments<'_>) {
        let _ = fmt::Write::write_fmt(&mut *self.buffer.lock(), args);
    }
}
