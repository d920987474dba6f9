use std::{
    io::{self, Write},
    net::{Shutdown, SocketAddr, TcpStream},
    time::Duration,
};

use super::{Connector, Link, TransportKind};

/// Connects TCP streams with bounded connect and send timeouts.
#[derive(Clone, Debug)]
pub struct TcpConnector {
    connect_timeout: Duration,
    send_timeout: Duration,
}

impl TcpConnector {
    pub fn new(connect_timeout: Duration, send_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            send_timeout,
        }
    }
}

impl Connector for TcpConnector {
    type Link = TcpLink;

    fn kind(&self) -> TransportKind {
        TransportKind::Tcp
    }

    fn connect(&mut self, endpoint: SocketAddr) -> io::Result<TcpLink> {
        let stream = TcpStream::connect_timeout(&endpoint, self.connect_timeout)?;
        stream.set_write_timeout(Some(self.send_timeout))?;
        stream.set_nodelay(true)?;
        Ok(TcpLink { stream })
    }
}

/// Stream link; shuts the connection down when dropped.
#[derive(Debug)]
pub struct TcpLink {
    stream: TcpStream,
}

impl Link for TcpLink {
    fn send_line(&mut self, line: &[u8]) -> io::Result<()> {
        write_fully(&mut self.stream, line)
    }
}

impl Drop for TcpLink {
    fn drop(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

/// Keep writing until `buf` is exhausted.
///
/// Partial writes continue from where they stopped. `Ok(0)` means the peer
/// closed the connection and is reported as [`io::ErrorKind::WriteZero`];
/// interrupted writes are retried.
pub fn write_fully<W: Write + ?Sized>(writer: &mut W, mut buf: &[u8]) -> io::Result<()> {
    while !buf.is_empty() {
        match writer.write(buf) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "peer closed the connection",
                ));
            }
            Ok(n) => buf = &buf[n..],
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
