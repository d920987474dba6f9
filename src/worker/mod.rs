//! Transport worker state machine.
//!
//! One worker runs per active transport on its own thread. It owns the only
//! connection to the collector and is the sole consumer of its transport's
//! channel:
//!
//! ```text
//! Resolving ──▶ Connecting ──▶ Connected ──(send failure)──┐
//!                   ▲                                      │
//!                   └──────────────────────────────────────┘
//! ```
//!
//! Resolution failure is fatal only at start-up. Every other failure is
//! absorbed: the line that failed is discarded, the socket is closed and the
//! worker reconnects after a bounded backoff. Producers never learn about it.

mod backoff;
mod pacer;


use std::{io, net::SocketAddr, time::Duration};

use crossbeam_channel::{Receiver, Sender};
use log::{info, warn};

use crate::{
    channel::Channel,
    drop_accounting::DropReporter,
    log_line::LogLine,
    rate_limited_warner::DEFAULT_WARN_INTERVAL,
    transport::{Connector, Destination, Link},
};

pub use backoff::{BackoffPolicy, BackoffState};
pub use pacer::{Pacer, ThreadPacer};

/// Send failures between two re-resolutions of the destination.
pub const DEFAULT_RESOLVE_EVERY: u32 = 10;
/// Successful sends between two explicit yields.
pub const DEFAULT_YIELD_EVERY: u32 = 50;

/// Retry and fairness knobs for one worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerPolicy {
    pub destination: Destination,
    pub connect_backoff: BackoffPolicy,
    pub send_backoff: BackoffPolicy,
    /// Re-resolve on every `resolve_every`-th send failure (0 disables).
    pub resolve_every: u32,
    /// Yield after every `yield_every` successful sends (0 disables).
    pub yield_every: u32,
    pub warn_interval: Duration,
}

impl WorkerPolicy {
    pub fn new(destination: Destination) -> Self {
        Self {
            destination,
            connect_backoff: BackoffPolicy::CONNECT,
            send_backoff: BackoffPolicy::SEND,
            resolve_every: DEFAULT_RESOLVE_EVERY,
            yield_every: DEFAULT_YIELD_EVERY,
            warn_interval: DEFAULT_WARN_INTERVAL,
        }
    }
}

/// One-shot start-up outcome reported to whoever launched the worker.
#[derive(Debug)]
pub enum Readiness {
    /// The first connection attempt succeeded.
    Connected(SocketAddr),
    /// The destination could not be resolved; the worker has exited.
    Unresolvable(io::Error),
}

/// Worker side of the start-up handshake.
///
/// The worker reports its first connection on `ready`, then waits on
/// `published` until the launcher has either published the channel (a
/// message) or given up on it (the sender dropped).
#[derive(Debug)]
pub struct Startup {
    ready: Sender<Readiness>,
    published: Receiver<()>,
}

impl Startup {
    pub fn new(ready: Sender<Readiness>, published: Receiver<()>) -> Self {
        Self { ready, published }
    }

    /// Report a fatal resolution failure. The launcher may already be gone.
    pub fn unresolvable(self, err: io::Error) {
        let _ = self.ready.try_send(Readiness::Unresolvable(err));
    }

    /// `true` once the launcher published the channel this worker serves.
    fn confirm(self, endpoint: SocketAddr) -> bool {
        self.ready.try_send(Readiness::Connected(endpoint)).is_ok()
            && self.published.recv().is_ok()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Resolving,
    Connecting,
    Connected,
}

/// Connection state and retry bookkeeping, owned by the worker thread.
///
/// The destination, both backoff schedules, and the failure counters persist
/// across reconnects; the link is rebuilt on each one.
pub struct TransportWorker<C: Connector, P: Pacer> {
    connector: C,
    pacer: P,
    policy: WorkerPolicy,
    state: WorkerState,
    endpoint: SocketAddr,
    link: Option<C::Link>,
    connect_backoff: BackoffState,
    send_backoff: BackoffState,
    consecutive_failures: u32,
    send_failures: u64,
    sends_since_yield: u32,
    drops: DropReporter,
}

impl<C: Connector, P: Pacer> TransportWorker<C, P> {
    /// Run the resolving step. Failure here is the only fatal error.
    pub fn start(mut connector: C, pacer: P, policy: WorkerPolicy) -> io::Result<Self> {
        let kind = connector.kind();
        let endpoint = connector.resolve(&policy.destination).inspect_err(|err| {
            warn!(
                "netlog {kind}: cannot resolve {}: {err}",
                policy.destination
            );
        })?;
        info!("netlog {kind}: start {} -> {endpoint}", policy.destination);
        Ok(Self {
            drops: DropReporter::new(kind, policy.warn_interval),
            connect_backoff: BackoffState::new(policy.connect_backoff),
            send_backoff: BackoffState::new(policy.send_backoff),
            connector,
            pacer,
            policy,
            state: WorkerState::Connecting,
            endpoint,
            link: None,
            consecutive_failures: 0,
            send_failures: 0,
            sends_since_yield: 0,
        })
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Send failures since the worker started; never reset.
    pub fn send_failures(&self) -> u64 {
        self.send_failures
    }

    /// Delay the next failed connect attempt would wait.
    pub fn connect_backoff(&self) -> Duration {
        self.connect_backoff.current()
    }

    /// Delay the next failed send would wait.
    pub fn send_backoff(&self) -> Duration {
        self.send_backoff.current()
    }

    /// Serve `channel`, completing `startup` after the first connection.
    ///
    /// Returns only if the launcher did not publish `channel`: it stopped
    /// waiting for readiness, or another worker of the same kind won the
    /// registry slot. Otherwise this never returns.
    pub fn run(mut self, channel: &Channel, startup: Option<Startup>) {
        self.connect();
        if let Some(startup) = startup
            && !startup.confirm(self.endpoint)
        {
            info!(
                "netlog {}: channel was not published; worker exiting",
                self.connector.kind()
            );
            return;
        }
        loop {
            let line = channel.pop();
            self.deliver(&line);
            self.drops.observe(channel.drop_counter());
        }
    }

    /// Open a link, retrying with the connect backoff until one succeeds.
    pub fn connect(&mut self) {
        self.state = WorkerState::Connecting;
        let kind = self.connector.kind();
        loop {
            match self.connector.connect(self.endpoint) {
                Ok(link) => {
                    self.link = Some(link);
                    self.connect_backoff.reset();
                    self.state = WorkerState::Connected;
                    info!("netlog {kind}: connected to {}", self.endpoint);
                    return;
                }
                Err(err) => {
                    let delay = self.connect_backoff.next_delay();
                    warn!(
                        "netlog {kind}: connect to {} failed: {err}; retrying in {delay:?}",
                        self.endpoint
                    );
                    self.pacer.sleep(delay);
                }
            }
        }
    }

    /// Transmit one line. The line is never retried.
    pub fn deliver(&mut self, line: &LogLine) {
        if line.is_empty() {
            return;
        }
        if self.link.is_none() {
            self.connect();
        }
        let Some(link) = self.link.as_mut() else {
            return;
        };
        match link.send_line(line.as_bytes()) {
            Ok(()) => self.on_send_success(),
            Err(err) => self.on_send_failure(&err),
        }
    }

    fn on_send_success(&mut self) {
        self.consecutive_failures = 0;
        self.send_backoff.reset();
        self.sends_since_yield += 1;
        if self.policy.yield_every > 0 && self.sends_since_yield >= self.policy.yield_every {
            self.sends_since_yield = 0;
            self.pacer.yield_now();
        }
    }

    fn on_send_failure(&mut self, err: &io::Error) {
        let kind = self.connector.kind();
        self.link = None;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.send_failures += 1;
        warn!(
            "netlog {kind}: send failed: {err} (streak={})",
            self.consecutive_failures
        );

        self.pacer.sleep(self.send_backoff.next_delay());

        let every = u64::from(self.policy.resolve_every);
        if every > 0 && self.send_failures % every == 0 {
            self.re_resolve();
        }

        self.connect_backoff.reset();
        self.connect();
    }

    fn re_resolve(&mut self) {
        let kind = self.connector.kind();
        self.state = WorkerState::Resolving;
        match self.connector.resolve(&self.policy.destination) {
            Ok(endpoint) => {
                if endpoint != self.endpoint {
                    info!(
                        "netlog {kind}: {} moved from {} to {endpoint}",
                        self.policy.destination, self.endpoint
                    );
                }
                self.endpoint = endpoint;
            }
            Err(err) => {
                warn!(
                    "netlog {kind}: re-resolve of {} failed: {err}; keeping {}",
                    self.policy.destination, self.endpoint
                );
            }
        }
        self.state = WorkerState::Connecting;
    }
}
