use std::{
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket},
    time::Duration,
};

use super::{Connector, Link, TransportKind};

/// Opens unconnected UDP sockets bound to an ephemeral local port.
#[derive(Clone, Debug)]
pub struct UdpConnector {
    send_timeout: Duration,
}

impl UdpConnector {
    pub fn new(send_timeout: Duration) -> Self {
        Self { send_timeout }
    }
}

impl Connector for UdpConnector {
    type Link = UdpLink;

    fn kind(&self) -> TransportKind {
        TransportKind::Udp
    }

    fn connect(&mut self, endpoint: SocketAddr) -> io::Result<UdpLink> {
        let local: SocketAddr = if endpoint.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local)?;
        socket.set_write_timeout(Some(self.send_timeout))?;
        Ok(UdpLink { socket, endpoint })
    }
}

/// Datagram link: each line is one `send_to`.
#[derive(Debug)]
pub struct UdpLink {
    socket: UdpSocket,
    endpoint: SocketAddr,
}

impl Link for UdpLink {
    fn send_line(&mut self, line: &[u8]) -> io::Result<()> {
        let sent = self.socket.send_to(line, self.endpoint)?;
        check_datagram(sent, line.len())
    }
}

/// A datagram is atomic: anything short of the full length is a failure.
pub fn check_datagram(sent: usize, expected: usize) -> io::Result<()> {
    if sent == expected {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::WriteZero,
            format!("short datagram: sent {sent} of {expected} bytes"),
        ))
    }
}
