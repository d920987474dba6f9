//! Start-up of the per-transport workers.
//!
//! Starting a transport spawns its worker thread and waits a bounded time for
//! the first outcome. Only after the worker reports a live connection is the
//! transport's channel published in the registry, so producers never see a
//! transport that failed to come up.

use std::{io, net::SocketAddr, sync::Arc, thread, time::Duration};

use crossbeam_channel::bounded;
use log::info;
use thiserror::Error;

use crate::{
    channel::Channel,
    config::{ConfigError, NetLogConfig, NetLogKind, TransportConfig, TransportConfigBuilder},
    log_compat::{global_router, install_global_router},
    registry::{self, Registry},
    transport::{Connector, Destination, TcpConnector, TransportKind, UdpConnector},
    worker::{Pacer, Readiness, Startup, ThreadPacer, TransportWorker, WorkerPolicy},
};

/// Errors reported by [`start`] and friends.
#[derive(Debug, Error)]
pub enum StartError {
    /// The destination could not be resolved.
    #[error("cannot resolve {destination}: {source}")]
    Resolve {
        destination: Destination,
        #[source]
        source: io::Error,
    },
    /// The worker did not connect within the readiness window.
    #[error("{kind} transport did not connect within {timeout:?}")]
    NotReady {
        kind: TransportKind,
        timeout: Duration,
    },
    #[error("{0} transport is already active")]
    AlreadyActive(TransportKind),
    /// The configured mode has no transport implementation.
    #[error("remote logging over {0} is not supported")]
    Unsupported(String),
    #[error("failed to spawn the {kind} worker: {source}")]
    Spawn {
        kind: TransportKind,
        #[source]
        source: io::Error,
    },
    /// A different global logger was installed first.
    #[error("another global logger is already installed")]
    LoggerInstall,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Handle onto a running transport.
///
/// Dropping the handle does not stop the worker.
#[derive(Clone, Debug)]
pub struct TransportHandle {
    kind: TransportKind,
    channel: Arc<Channel>,
    endpoint: SocketAddr,
}

impl TransportHandle {
    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    /// Lines dropped because the channel was full.
    pub fn dropped(&self) -> u64 {
        self.channel.dropped()
    }

    /// Lines waiting for the worker.
    pub fn queued(&self) -> usize {
        self.channel.len()
    }

    /// Channel capacity in lines.
    pub fn capacity(&self) -> usize {
        self.channel.capacity()
    }

    /// Address the worker connected to at start-up.
    pub fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }
}

/// Start `kind` towards `host:port` with default tuning.
pub fn start(
    kind: TransportKind,
    host: impl Into<String>,
    port: u16,
    mirror_to_console: bool,
) -> Result<TransportHandle, StartError> {
    let config = TransportConfigBuilder::new(kind)
        .with_destination(host, port)
        .with_mirror_to_console(mirror_to_console)
        .build()?;
    start_with_config(&config)
}

/// Start a transport and route the process's `log` output into it.
///
/// The global router is installed on first use. On success the mirror flag
/// is updated to `config.mirror_to_console`; the last successful start wins.
pub fn start_with_config(config: &TransportConfig) -> Result<TransportHandle, StartError> {
    if !install_global_router(config.max_level) {
        return Err(StartError::LoggerInstall);
    }
    let router = global_router().ok_or(StartError::LoggerInstall)?;
    let handle = launch(router.registry(), config)?;
    router.set_mirror_to_console(config.mirror_to_console);
    Ok(handle)
}

/// Start a transport using the real socket connectors, publishing its channel
/// in `registry`.
pub fn launch(registry: &Registry, config: &TransportConfig) -> Result<TransportHandle, StartError> {
    match config.kind {
        TransportKind::Udp => launch_with(
            registry,
            config,
            UdpConnector::new(config.send_timeout),
            ThreadPacer,
        ),
        TransportKind::Tcp => launch_with(
            registry,
            config,
            TcpConnector::new(config.connect_timeout, config.send_timeout),
            ThreadPacer,
        ),
    }
}

/// Start a transport over an arbitrary connector and pacer.
pub fn launch_with<C, P>(
    registry: &Registry,
    config: &TransportConfig,
    connector: C,
    pacer: P,
) -> Result<TransportHandle, StartError>
where
    C: Connector + 'static,
    P: Pacer + 'static,
{
    let kind = config.kind;
    if connector.kind() != kind {
        return Err(StartError::Config(ConfigError::InvalidConfig(format!(
            "{} connector cannot serve a {kind} transport",
            connector.kind()
        ))));
    }
    if registry.is_active(kind) {
        return Err(StartError::AlreadyActive(kind));
    }

    let channel = Arc::new(Channel::new(config.capacity, config.backend));
    let (ready_tx, ready_rx) = bounded(1);
    // Dropping `published_tx` without sending tells the worker to exit.
    let (published_tx, published_rx) = bounded(1);
    let startup = Startup::new(ready_tx, published_rx);
    let worker_channel = Arc::clone(&channel);
    let policy = config.worker_policy();
    thread::Builder::new()
        .name(format!("netlog-{kind}"))
        .spawn(move || worker_main(connector, pacer, policy, &worker_channel, startup))
        .map_err(|source| StartError::Spawn { kind, source })?;

    let endpoint = match ready_rx.recv_timeout(config.ready_timeout) {
        Ok(Readiness::Connected(endpoint)) => endpoint,
        Ok(Readiness::Unresolvable(source)) => {
            return Err(StartError::Resolve {
                destination: config.destination.clone(),
                source,
            });
        }
        Err(_) => {
            return Err(StartError::NotReady {
                kind,
                timeout: config.ready_timeout,
            });
        }
    };

    registry
        .register(kind, Arc::clone(&channel))
        .map_err(|_| StartError::AlreadyActive(kind))?;
    let _ = published_tx.send(());
    info!(
        "netlog {kind}: remote logging to {} ({endpoint}) enabled",
        config.destination
    );
    Ok(TransportHandle {
        kind,
        channel,
        endpoint,
    })
}

fn worker_main<C: Connector, P: Pacer>(
    connector: C,
    pacer: P,
    policy: WorkerPolicy,
    channel: &Channel,
    startup: Startup,
) {
    match TransportWorker::start(connector, pacer, policy) {
        Ok(worker) => worker.run(channel, Some(startup)),
        Err(err) => startup.unresolvable(err),
    }
}

/// Drop count of the globally registered `kind` transport.
pub fn dropped_lines(kind: TransportKind) -> Option<u64> {
    registry::global().dropped(kind)
}

/// Enable whatever remote logging the persisted settings select.
///
/// Returns `Ok(None)` when remote logging is disabled.
pub fn setup_remote_logging(config: &NetLogConfig) -> Result<Option<TransportHandle>, StartError> {
    if config.kind == NetLogKind::Mqtt {
        return Err(StartError::Unsupported("mqtt".into()));
    }
    match config.transport_config()? {
        Some(transport) => start_with_config(&transport).map(Some),
        None => Ok(None),
    }
}
