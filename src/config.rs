//! Configuration for the network log transports.
//!
//! [`TransportConfig`] is the fully resolved description of one transport
//! and is produced either programmatically through
//! [`TransportConfigBuilder`] or from the persisted device settings held in a
//! [`NetLogConfig`]. The persisted form lives in the `[net_logging]` section
//! of an INI file:
//!
//! ```ini
//! [net_logging]
//! net_log_type = udp
//! net_log_host = 192.0.2.7
//! net_log_port = 514
//! net_log_stdout = 1
//! net_log_level = debug
//! ```
//!
//! `net_log_type` accepts `0|disabled`, `1|udp`, `2|tcp` and `3|mqtt`.

use std::{fs, io, path::Path, str::FromStr, time::Duration};

use ini::Ini;
use log::LevelFilter;
use thiserror::Error;

use crate::{
    channel::ChannelBackend,
    rate_limited_warner::DEFAULT_WARN_INTERVAL,
    transport::{Destination, TransportKind},
    worker::{BackoffPolicy, DEFAULT_RESOLVE_EVERY, DEFAULT_YIELD_EVERY, WorkerPolicy},
};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 514;
/// Longest accepted destination host, in bytes.
pub const MAX_HOST_LEN: usize = 256;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
/// How long `start` waits for the worker's first outcome.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_millis(1000);
pub const DEFAULT_MAX_LEVEL: LevelFilter = LevelFilter::Info;

/// INI section holding the persisted settings.
pub const INI_SECTION: &str = "net_logging";

/// Errors raised while building or loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is out of range or inconsistent.
    #[error("invalid net logging configuration: {0}")]
    InvalidConfig(String),
    /// The settings file could not be read.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The settings file is not valid INI.
    #[error("invalid settings file: {0}")]
    Ini(String),
}

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err(ConfigError::InvalidConfig(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok(())
        }
    }};
}

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

/// Everything needed to start one transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportConfig {
    pub kind: TransportKind,
    pub destination: Destination,
    /// Repeat every line on stderr as well.
    pub mirror_to_console: bool,
    /// Channel capacity in lines.
    pub capacity: usize,
    pub backend: ChannelBackend,
    pub connect_timeout: Duration,
    pub send_timeout: Duration,
    pub ready_timeout: Duration,
    pub connect_backoff: BackoffPolicy,
    pub send_backoff: BackoffPolicy,
    pub resolve_every: u32,
    pub yield_every: u32,
    pub warn_interval: Duration,
    pub max_level: LevelFilter,
}

impl TransportConfig {
    /// Defaults for `kind` pointed at `host:port`.
    pub fn new(kind: TransportKind, host: impl Into<String>, port: u16) -> Self {
        Self {
            kind,
            destination: Destination::new(host, port),
            mirror_to_console: true,
            capacity: DEFAULT_CHANNEL_CAPACITY,
            backend: ChannelBackend::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            connect_backoff: BackoffPolicy::CONNECT,
            send_backoff: BackoffPolicy::SEND,
            resolve_every: DEFAULT_RESOLVE_EVERY,
            yield_every: DEFAULT_YIELD_EVERY,
            warn_interval: DEFAULT_WARN_INTERVAL,
            max_level: DEFAULT_MAX_LEVEL,
        }
    }

    pub fn builder(kind: TransportKind) -> TransportConfigBuilder {
        TransportConfigBuilder::new(kind)
    }

    /// Retry and fairness settings handed to the worker.
    pub fn worker_policy(&self) -> WorkerPolicy {
        WorkerPolicy {
            destination: self.destination.clone(),
            connect_backoff: self.connect_backoff,
            send_backoff: self.send_backoff,
            resolve_every: self.resolve_every,
            yield_every: self.yield_every,
            warn_interval: self.warn_interval,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new(TransportKind::Udp, DEFAULT_HOST, DEFAULT_PORT)
    }
}

/// Fluent, validating constructor for [`TransportConfig`].
#[derive(Clone, Debug)]
pub struct TransportConfigBuilder {
    kind: TransportKind,
    host: Option<String>,
    port: Option<u16>,
    mirror_to_console: Option<bool>,
    capacity: Option<usize>,
    backend: Option<ChannelBackend>,
    connect_timeout: Option<Duration>,
    send_timeout: Option<Duration>,
    ready_timeout: Option<Duration>,
    connect_backoff: Option<BackoffPolicy>,
    send_backoff: Option<BackoffPolicy>,
    resolve_every: Option<u32>,
    yield_every: Option<u32>,
    warn_interval: Option<Duration>,
    max_level: Option<LevelFilter>,
}

impl TransportConfigBuilder {
    pub fn new(kind: TransportKind) -> Self {
        Self {
            kind,
            host: None,
            port: None,
            mirror_to_console: None,
            capacity: None,
            backend: None,
            connect_timeout: None,
            send_timeout: None,
            ready_timeout: None,
            connect_backoff: None,
            send_backoff: None,
            resolve_every: None,
            yield_every: None,
            warn_interval: None,
            max_level: None,
        }
    }

    /// Point the transport at `host:port`.
    pub fn with_destination(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = Some(host.into());
        self.port = Some(port);
        self
    }

    option_setter!(with_mirror_to_console, mirror_to_console, bool);
    option_setter!(
        #[doc = "Set the channel capacity in lines."]
        with_capacity,
        capacity,
        usize
    );
    option_setter!(with_backend, backend, ChannelBackend);
    option_setter!(with_connect_timeout, connect_timeout, Duration);
    option_setter!(
        #[doc = "Bound every individual send on the socket."]
        with_send_timeout,
        send_timeout,
        Duration
    );
    option_setter!(with_ready_timeout, ready_timeout, Duration);
    option_setter!(with_connect_backoff, connect_backoff, BackoffPolicy);
    option_setter!(with_send_backoff, send_backoff, BackoffPolicy);
    option_setter!(
        #[doc = "Re-resolve the destination every `n` send failures; zero disables."]
        with_resolve_every,
        resolve_every,
        u32
    );
    option_setter!(
        #[doc = "Yield after every `n` successful sends; zero disables."]
        with_yield_every,
        yield_every,
        u32
    );
    option_setter!(with_warn_interval, warn_interval, Duration);
    option_setter!(with_max_level, max_level, LevelFilter);

    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_destination()?;
        self.validate_capacity()?;
        self.validate_timeouts()?;
        self.validate_backoff()?;
        Ok(())
    }

    fn validate_destination(&self) -> Result<(), ConfigError> {
        if let Some(host) = &self.host {
            validate_host(host)?;
        }
        if let Some(port) = self.port {
            ensure_positive!(port, "port")?;
        }
        Ok(())
    }

    fn validate_capacity(&self) -> Result<(), ConfigError> {
        if let Some(capacity) = self.capacity {
            ensure_positive!(capacity, "capacity")?;
        }
        Ok(())
    }

    fn validate_timeouts(&self) -> Result<(), ConfigError> {
        let timeouts = [
            (self.connect_timeout, "connect_timeout"),
            (self.send_timeout, "send_timeout"),
            (self.ready_timeout, "ready_timeout"),
        ];
        for (timeout, field) in timeouts {
            if let Some(timeout) = timeout {
                ensure_positive!(timeout.as_nanos(), field)?;
            }
        }
        Ok(())
    }

    fn validate_backoff(&self) -> Result<(), ConfigError> {
        let policies = [
            (self.connect_backoff, "connect_backoff"),
            (self.send_backoff, "send_backoff"),
        ];
        for (policy, field) in policies {
            let Some(policy) = policy else { continue };
            ensure_positive!(policy.floor.as_nanos(), format!("{field} floor"))?;
            if policy.floor > policy.cap {
                return Err(ConfigError::InvalidConfig(format!(
                    "{field} floor {:?} exceeds cap {:?}",
                    policy.floor, policy.cap
                )));
            }
        }
        Ok(())
    }

    pub fn build(&self) -> Result<TransportConfig, ConfigError> {
        self.validate()?;
        let mut config = TransportConfig::new(
            self.kind,
            self.host.clone().unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            self.port.unwrap_or(DEFAULT_PORT),
        );
        self.apply_optional_fields(&mut config);
        Ok(config)
    }

    fn apply_optional_fields(&self, config: &mut TransportConfig) {
        if let Some(mirror) = self.mirror_to_console {
            config.mirror_to_console = mirror;
        }
        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(timeout) = self.connect_timeout {
            config.connect_timeout = timeout;
        }
        if let Some(timeout) = self.send_timeout {
            config.send_timeout = timeout;
        }
        if let Some(timeout) = self.ready_timeout {
            config.ready_timeout = timeout;
        }
        if let Some(policy) = self.connect_backoff {
            config.connect_backoff = policy;
        }
        if let Some(policy) = self.send_backoff {
            config.send_backoff = policy;
        }
        if let Some(every) = self.resolve_every {
            config.resolve_every = every;
        }
        if let Some(every) = self.yield_every {
            config.yield_every = every;
        }
        if let Some(interval) = self.warn_interval {
            config.warn_interval = interval;
        }
        if let Some(level) = self.max_level {
            config.max_level = level;
        }
    }
}

fn validate_host(host: &str) -> Result<(), ConfigError> {
    if host.trim().is_empty() {
        return Err(ConfigError::InvalidConfig("host must not be empty".into()));
    }
    if host.len() > MAX_HOST_LEN {
        return Err(ConfigError::InvalidConfig(format!(
            "host is {} bytes long; at most {MAX_HOST_LEN} are allowed",
            host.len()
        )));
    }
    Ok(())
}

/// Remote logging mode selected by the persisted settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NetLogKind {
    #[default]
    Disabled,
    Udp,
    Tcp,
    /// Accepted for compatibility with stored settings but not supported.
    Mqtt,
}

impl NetLogKind {
    /// The transport carrying this mode, if any.
    pub fn transport(self) -> Option<TransportKind> {
        match self {
            NetLogKind::Udp => Some(TransportKind::Udp),
            NetLogKind::Tcp => Some(TransportKind::Tcp),
            NetLogKind::Disabled | NetLogKind::Mqtt => None,
        }
    }
}

impl FromStr for NetLogKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "disabled" | "off" | "none" => Ok(Self::Disabled),
            "1" | "udp" => Ok(Self::Udp),
            "2" | "tcp" => Ok(Self::Tcp),
            "3" | "mqtt" => Ok(Self::Mqtt),
            other => Err(ConfigError::InvalidConfig(format!(
                "unknown net_log_type {other:?}"
            ))),
        }
    }
}

/// Persisted remote logging settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetLogConfig {
    pub kind: NetLogKind,
    pub host: String,
    pub port: u16,
    /// Keep writing to the local console while logging remotely.
    pub keep_stdout: bool,
    pub max_level: LevelFilter,
}

impl Default for NetLogConfig {
    fn default() -> Self {
        Self {
            kind: NetLogKind::Disabled,
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            keep_stdout: true,
            max_level: DEFAULT_MAX_LEVEL,
        }
    }
}

impl NetLogConfig {
    /// Parse the `[net_logging]` section of INI text.
    ///
    /// Missing keys, or a missing section, fall back to the defaults.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|err| ConfigError::Ini(err.to_string()))?;
        let mut config = Self::default();
        let Some(section) = ini.section(Some(INI_SECTION)) else {
            return Ok(config);
        };
        if let Some(kind) = section.get("net_log_type") {
            config.kind = kind.parse()?;
        }
        if let Some(host) = section.get("net_log_host") {
            validate_host(host)?;
            config.host = host.trim().to_owned();
        }
        if let Some(port) = section.get("net_log_port") {
            config.port = parse_port(port)?;
        }
        if let Some(flag) = section.get("net_log_stdout") {
            config.keep_stdout = parse_flag("net_log_stdout", flag)?;
        }
        if let Some(level) = section.get("net_log_level") {
            config.max_level = level.trim().parse().map_err(|_| {
                ConfigError::InvalidConfig(format!("unknown net_log_level {level:?}"))
            })?;
        }
        Ok(config)
    }

    pub fn from_ini_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_ini_str(&text)
    }

    /// Transport configuration for the selected mode.
    ///
    /// Returns `Ok(None)` when remote logging is disabled or the mode has no
    /// transport behind it.
    pub fn transport_config(&self) -> Result<Option<TransportConfig>, ConfigError> {
        let Some(kind) = self.kind.transport() else {
            return Ok(None);
        };
        TransportConfigBuilder::new(kind)
            .with_destination(self.host.clone(), self.port)
            .with_mirror_to_console(self.keep_stdout)
            .with_max_level(self.max_level)
            .build()
            .map(Some)
    }
}

fn parse_port(value: &str) -> Result<u16, ConfigError> {
    let port: u16 = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidConfig(format!("invalid net_log_port {value:?}")))?;
    ensure_positive!(port, "net_log_port")?;
    Ok(port)
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidConfig(format!(
            "{key} must be a boolean, got {value:?}"
        ))),
    }
}
