use std::{thread, time::Duration};

/// Source of the worker's bounded delays and cooperative yields.
pub trait Pacer: Send {
    fn sleep(&mut self, duration: Duration);

    /// Give other threads a chance to run.
    fn yield_now(&mut self);
}

/// [`Pacer`] backed by the OS scheduler.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }

    fn yield_now(&mut self) {
        thread::yield_now();
    }
}
