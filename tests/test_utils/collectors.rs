//! Loopback log collectors for the pipeline integration tests.
//!
//! Both collectors listen on an ephemeral `127.0.0.1` port and hand received
//! lines back to the test as strings.

use std::{
    io::{BufRead, BufReader},
    net::{TcpListener, UdpSocket},
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, unbounded};

const RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Datagram collector: every datagram is one line.
pub struct UdpCollector {
    socket: UdpSocket,
}

#[allow(dead_code)]
impl UdpCollector {
    pub fn bind() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").expect("bind udp collector");
        socket
            .set_read_timeout(Some(Duration::from_millis(100)))
            .expect("set read timeout");
        Self { socket }
    }

    pub fn port(&self) -> u16 {
        self.socket.local_addr().expect("collector address").port()
    }

    /// Receive datagrams until one contains `needle`, returning every
    /// datagram seen up to and including it.
    pub fn recv_until(&self, needle: &str) -> Option<Vec<String>> {
        let deadline = Instant::now() + RECEIVE_TIMEOUT;
        let mut seen = Vec::new();
        let mut buf = [0u8; 2048];
        while Instant::now() < deadline {
            let Ok((n, _)) = self.socket.recv_from(&mut buf) else {
                continue;
            };
            let line = String::from_utf8_lossy(&buf[..n]).into_owned();
            let found = line.contains(needle);
            seen.push(line);
            if found {
                return Some(seen);
            }
        }
        None
    }
}

/// Stream collector: accepts connections and splits their bytes into lines.
pub struct TcpCollector {
    port: u16,
    lines: Receiver<String>,
}

#[allow(dead_code)]
impl TcpCollector {
    pub fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind tcp collector");
        let port = listener.local_addr().expect("collector address").port();
        let (tx, lines) = unbounded();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let tx = tx.clone();
                thread::spawn(move || {
                    let mut reader = BufReader::new(stream);
                    let mut line = String::new();
                    while matches!(reader.read_line(&mut line), Ok(n) if n > 0) {
                        if tx.send(std::mem::take(&mut line)).is_err() {
                            return;
                        }
                    }
                });
            }
        });
        Self { port, lines }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Receive lines until one contains `needle`, returning every line seen
    /// up to and including it.
    pub fn recv_until(&self, needle: &str) -> Option<Vec<String>> {
        let deadline = Instant::now() + RECEIVE_TIMEOUT;
        let mut seen = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let line = self.lines.recv_timeout(remaining).ok()?;
            let found = line.contains(needle);
            seen.push(line);
            if found {
                return Some(seen);
            }
        }
    }
}
