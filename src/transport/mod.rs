//! Transport kinds, destinations, and the socket seams used by workers.
//!
//! A [`Connector`] knows how to resolve a [`Destination`] and open a fresh
//! [`Link`] to the resolved endpoint. The worker state machine drives these
//! traits and never touches sockets directly, which keeps its retry policy
//! testable without a network.

mod tcp;
mod udp;

use std::{
    fmt, io,
    net::{IpAddr, SocketAddr, ToSocketAddrs},
    str::FromStr,
};

pub use tcp::{TcpConnector, TcpLink, write_fully};
pub use udp::{UdpConnector, UdpLink, check_datagram};

/// Network transports able to carry the log stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Connectionless datagrams (UDP).
    Udp,
    /// Connection-oriented byte stream (TCP).
    Tcp,
}

impl TransportKind {
    /// Number of transport kinds; sizes the channel registry.
    pub const COUNT: usize = 2;

    pub const ALL: [TransportKind; Self::COUNT] = [TransportKind::Udp, TransportKind::Tcp];

    pub(crate) const fn index(self) -> usize {
        match self {
            TransportKind::Udp => 0,
            TransportKind::Tcp => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Udp => "udp",
            TransportKind::Tcp => "tcp",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "udp" | "datagram" => Ok(Self::Udp),
            "tcp" | "stream" => Ok(Self::Tcp),
            _ => Err(()),
        }
    }
}

/// Configured log collector: a literal address or a hostname plus a port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Destination {
    pub host: String,
    pub port: u16,
}

impl Destination {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Resolve the destination to a socket address.
    ///
    /// A numeric address is parsed directly; anything else goes through name
    /// resolution, preferring the first IPv4 result.
    pub fn resolve(&self) -> io::Result<SocketAddr> {
        if let Ok(ip) = self.host.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.port));
        }
        let addrs: Vec<SocketAddr> = (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .collect();
        addrs
            .iter()
            .find(|addr| addr.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no address found for {}", self.host),
                )
            })
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// An open socket able to transmit one log line at a time.
///
/// Dropping a link closes the underlying socket.
pub trait Link: Send {
    /// Transmit `line` completely or report failure.
    fn send_line(&mut self, line: &[u8]) -> io::Result<()>;
}

/// Factory for [`Link`]s of one transport kind.
pub trait Connector: Send {
    type Link: Link;

    fn kind(&self) -> TransportKind;

    fn resolve(&mut self, destination: &Destination) -> io::Result<SocketAddr> {
        destination.resolve()
    }

    /// Open a new socket to `endpoint`, applying the send timeout.
    fn connect(&mut self, endpoint: SocketAddr) -> io::Result<Self::Link>;
}

#[cfg(test)]
mod tests;
