//! Remote log transport for relay-controller firmware.
//!
//! Log calls made anywhere in the process (through the `log` facade) are
//! formatted once into a bounded [`LogLine`], pushed without blocking into the
//! channel of every active transport, and delivered best-effort to a remote
//! collector by one worker thread per transport.
//!
//! ```no_run
//! use netlogging::{TransportKind, start};
//!
//! let handle = start(TransportKind::Udp, "192.0.2.7", 514, true)?;
//! log::info!("relay 3 closed");
//! println!("{} lines dropped so far", handle.dropped());
//! # Ok::<(), netlogging::StartError>(())
//! ```

pub mod channel;
pub mod config;
pub mod drop_accounting;
pub mod log_compat;
pub mod log_line;
pub mod rate_limited_warner;
pub mod registry;
pub mod router;
pub mod start;
pub mod transport;
pub mod worker;

#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;

pub use channel::{Channel, ChannelBackend, LineChannel, PushOutcome};
pub use config::{ConfigError, NetLogConfig, NetLogKind, TransportConfig, TransportConfigBuilder};
pub use drop_accounting::DropCounter;
pub use log_compat::{NetLogAdapter, install_global_router};
pub use log_line::{LINE_CAPACITY, LogLine};
pub use registry::Registry;
pub use router::{ConsoleSink, NetLogRouter, StderrConsole};
pub use start::{
    StartError, TransportHandle, dropped_lines, launch, launch_with, setup_remote_logging, start,
    start_with_config,
};
pub use transport::{Connector, Destination, Link, TransportKind};
pub use worker::{BackoffPolicy, Pacer, TransportWorker, WorkerPolicy};
