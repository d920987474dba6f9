//! Bridge from the `log` crate facade into the network log router.
//!
//! [`NetLogAdapter`] implements `log::Log`. Every enabled record is formatted
//! as `"<L> (<uptime ms>) <target>: <message>\n"` and handed to a
//! [`NetLogRouter`], which fans it out to the active transports. Installing
//! the adapter globally is explicit and happens at most once per process.

use std::{sync::OnceLock, time::Instant};

use log::{Level, LevelFilter, Metadata, Record};

use crate::{
    registry::{self, Registry},
    router::{ConsoleSink, NetLogRouter, StderrConsole},
};

/// Single-letter level tag used at the start of each line.
pub fn level_letter(level: Level) -> char {
    match level {
        Level::Error => 'E',
        Level::Warn => 'W',
        Level::Info => 'I',
        Level::Debug => 'D',
        Level::Trace => 'V',
    }
}

/// `log::Log` implementation feeding a [`NetLogRouter`].
pub struct NetLogAdapter<'a, C: ConsoleSink = StderrConsole> {
    router: NetLogRouter<'a, C>,
    started: Instant,
}

impl<'a> NetLogAdapter<'a, StderrConsole> {
    pub fn new(registry: &'a Registry) -> Self {
        Self::with_router(NetLogRouter::new(registry, false))
    }
}

impl<'a, C: ConsoleSink> NetLogAdapter<'a, C> {
    pub fn with_router(router: NetLogRouter<'a, C>) -> Self {
        Self {
            router,
            started: Instant::now(),
        }
    }

    pub fn router(&self) -> &NetLogRouter<'a, C> {
        &self.router
    }

    /// Milliseconds since the adapter was created.
    pub fn uptime_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }
}

fn is_enabled_by_global_max(level: Level) -> bool {
    level <= log::max_level()
}

impl<C: ConsoleSink> log::Log for NetLogAdapter<'_, C> {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        is_enabled_by_global_max(metadata.level())
    }

    fn log(&self, record: &Record<'_>) {
        if !is_enabled_by_global_max(record.level()) {
            return;
        }
        self.router.emit(format_args!(
            "{} ({}) {}: {}\n",
            level_letter(record.level()),
            self.uptime_ms(),
            record.target(),
            record.args()
        ));
    }

    fn flush(&self) {}
}

static ADAPTER: OnceLock<NetLogAdapter<'static>> = OnceLock::new();
static INSTALL_RESULT: OnceLock<bool> = OnceLock::new();

/// Install the router over the global registry as the process's logger.
///
/// Returns `true` when the adapter is (or already was) the global logger and
/// applies `max_level` in that case. Returns `false` if some other logger was
/// installed first; the outcome is cached.
pub fn install_global_router(max_level: LevelFilter) -> bool {
    let installed = *INSTALL_RESULT.get_or_init(|| {
        let adapter = ADAPTER.get_or_init(|| NetLogAdapter::new(registry::global()));
        log::set_logger(adapter).is_ok()
    });
    if installed {
        log::set_max_level(max_level);
    }
    installed
}

/// The router behind the global logger, once installed.
pub fn global_router() -> Option<&'static NetLogRouter<'static>> {
    if INSTALL_RESULT.get().copied() != Some(true) {
        return None;
    }
    ADAPTER.get().map(NetLogAdapter::router)
}
