//! Fan-out of formatted log lines into every active channel.
//!
//! [`NetLogRouter::emit`] runs synchronously in whatever context issued the
//! log call. It renders once into a stack-allocated [`LogLine`], pushes a copy
//! into each registered channel without blocking, and optionally repeats the
//! untruncated text on the console. Nothing here returns an error or waits:
//! a full channel just bumps that channel's drop counter.

use std::{
    cell::Cell,
    fmt,
    io::{self, Write},
    sync::atomic::{AtomicBool, Ordering},
};

use crate::{log_line::LogLine, registry::Registry};

/// Destination of mirrored console output.
pub trait ConsoleSink: Send + Sync {
    fn write_fmt(&self, args: fmt::Arguments<'_>);
}

/// Mirrors to the process's standard error.
#[derive(Clone, Copy, Debug, Default)]
pub struct StderrConsole;

impl ConsoleSink for StderrConsole {
    fn write_fmt(&self, args: fmt::Arguments<'_>) {
        let mut out = LossyWriter(io::stderr().lock());
        // A failing `Display` impl only shortens the mirrored text.
        let _ = fmt::write(&mut out, args);
    }
}

/// `fmt::Write` over an `io::Write` that swallows I/O errors.
struct LossyWriter<W: Write>(W);

impl<W: Write> fmt::Write for LossyWriter<W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let _ = self.0.write_all(s.as_bytes());
        Ok(())
    }
}

thread_local! {
    static IN_EMIT: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as inside `emit` for the guard's lifetime.
struct ReentryGuard {
    armed: bool,
}

impl ReentryGuard {
    /// Returns `None` when the thread is already emitting.
    fn enter() -> Option<Self> {
        match IN_EMIT.try_with(|flag| flag.replace(true)) {
            Ok(true) => None,
            Ok(false) => Some(Self { armed: true }),
            // Thread-local storage is being torn down; nothing to guard.
            Err(_) => Some(Self { armed: false }),
        }
    }
}

impl Drop for ReentryGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = IN_EMIT.try_with(|flag| flag.set(false));
        }
    }
}

/// The diagnostic sink behind the process-wide logging entry point.
pub struct NetLogRouter<'a, C: ConsoleSink = StderrConsole> {
    registry: &'a Registry,
    mirror_to_console: AtomicBool,
    console: C,
}

impl<'a> NetLogRouter<'a, StderrConsole> {
    pub const fn new(registry: &'a Registry, mirror_to_console: bool) -> Self {
        Self::with_console(registry, mirror_to_console, StderrConsole)
    }
}

impl<'a, C: ConsoleSink> NetLogRouter<'a, C> {
    pub const fn with_console(registry: &'a Registry, mirror_to_console: bool, console: C) -> Self {
        Self {
            registry,
            mirror_to_console: AtomicBool::new(mirror_to_console),
            console,
        }
    }

    /// Registry whose channels receive every emitted line.
    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Whether emitted text is also written to the console.
    pub fn mirror_to_console(&self) -> bool {
        self.mirror_to_console.load(Ordering::Relaxed)
    }

    pub fn set_mirror_to_console(&self, enabled: bool) {
        self.mirror_to_console.store(enabled, Ordering::Relaxed);
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    /// Render `args` once and fan the line out.
    ///
    /// Calls made while the same thread is already inside `emit` (for
    /// example from a `Display` impl that logs) are discarded.
    pub fn emit(&self, args: fmt::Arguments<'_>) {
        let Some(_guard) = ReentryGuard::enter() else {
            return;
        };
        let line = LogLine::render(args);
        self.dispatch(&line);
        if self.mirror_to_console() {
            self.console.write_fmt(args);
        }
    }

    /// Push an already rendered line into every active channel.
    ///
    /// Each push is independent: a full channel does not stop the others.
    pub fn dispatch(&self, line: &LogLine) {
        if line.is_empty() {
            return;
        }
        for (_, channel) in self.registry.active() {
            let _ = channel.push(line);
        }
    }
}
