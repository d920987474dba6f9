//! Scriptable in-memory network for exercising transport workers.
//!
//! A [`FakeNetwork`] is a cloneable handle onto shared state. Tests keep one
//! handle to script failures and inspect traffic while a [`FakeConnector`]
//! built from another handle is moved into the worker.

use std::{
    io::{self, Write},
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use crate::transport::{Connector, Destination, Link, TransportKind, write_fully};

#[derive(Debug)]
struct NetworkState {
    endpoint: SocketAddr,
    unresolvable: bool,
    online: bool,
    fail_next_connects: usize,
    fail_next_sends: usize,
    interrupt_next_writes: usize,
    max_chunk: Option<usize>,
    byte_budget: Option<usize>,
    resolve_calls: usize,
    connect_attempts: usize,
    connected_to: Vec<SocketAddr>,
    connections: Vec<Vec<u8>>,
    datagrams: Vec<Vec<u8>>,
    open_links: usize,
}

impl NetworkState {
    fn new(endpoint: SocketAddr) -> Self {
        Self {
            endpoint,
            unresolvable: false,
            online: true,
            fail_next_connects: 0,
            fail_next_sends: 0,
            interrupt_next_writes: 0,
            max_chunk: None,
            byte_budget: None,
            resolve_calls: 0,
            connect_attempts: 0,
            connected_to: Vec::new(),
            connections: Vec::new(),
            datagrams: Vec::new(),
            open_links: 0,
        }
    }
}

fn closed(reason: &str) -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, reason.to_owned())
}

/// Shared handle onto a simulated collector.
#[derive(Clone, Debug)]
pub struct FakeNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl Default for FakeNetwork {
    fn default() -> Self {
        Self::new(SocketAddr::from((Ipv4Addr::new(192, 0, 2, 10), 514)))
    }
}

impl FakeNetwork {
    pub fn new(endpoint: SocketAddr) -> Self {
        Self {
            state: Arc::new(Mutex::new(NetworkState::new(endpoint))),
        }
    }

    /// Connector of `kind` attached to this network.
    pub fn connector(&self, kind: TransportKind) -> FakeConnector {
        FakeConnector {
            kind,
            network: self.clone(),
        }
    }

    /// While offline every connect and send fails.
    pub fn set_online(&self, online: bool) {
        self.state.lock().online = online;
    }

    pub fn set_unresolvable(&self, unresolvable: bool) {
        self.state.lock().unresolvable = unresolvable;
    }

    /// Address returned by subsequent resolutions.
    pub fn set_endpoint(&self, endpoint: SocketAddr) {
        self.state.lock().endpoint = endpoint;
    }

    pub fn fail_next_connects(&self, count: usize) {
        self.state.lock().fail_next_connects = count;
    }

    pub fn fail_next_sends(&self, count: usize) {
        self.state.lock().fail_next_sends = count;
    }

    /// Stream writes report `Interrupted` this many times before progressing.
    pub fn interrupt_next_writes(&self, count: usize) {
        self.state.lock().interrupt_next_writes = count;
    }

    /// Cap the bytes a single stream write accepts.
    pub fn set_max_chunk(&self, chunk: Option<usize>) {
        self.state.lock().max_chunk = chunk;
    }

    /// Stream bytes accepted before the peer resets the connection.
    pub fn set_byte_budget(&self, budget: Option<usize>) {
        self.state.lock().byte_budget = budget;
    }

    pub fn resolve_calls(&self) -> usize {
        self.state.lock().resolve_calls
    }

    pub fn connect_attempts(&self) -> usize {
        self.state.lock().connect_attempts
    }

    /// Endpoints of every successful connection, in order.
    pub fn connected_to(&self) -> Vec<SocketAddr> {
        self.state.lock().connected_to.clone()
    }

    /// Links handed out and not yet dropped.
    pub fn open_links(&self) -> usize {
        self.state.lock().open_links
    }

    /// Bytes received on each connection, in connection order.
    pub fn connections(&self) -> Vec<Vec<u8>> {
        self.state.lock().connections.clone()
    }

    /// Stream bytes from every connection, concatenated.
    pub fn stream_bytes(&self) -> Vec<u8> {
        self.state.lock().connections.concat()
    }

    pub fn datagrams(&self) -> Vec<Vec<u8>> {
        self.state.lock().datagrams.clone()
    }

    /// Datagrams received so far decoded as text.
    pub fn datagram_texts(&self) -> Vec<String> {
        self.state
            .lock()
            .datagrams
            .iter()
            .map(|datagram| String::from_utf8_lossy(datagram).into_owned())
            .collect()
    }

    /// Poll until at least `count` datagrams arrived or `timeout` elapsed.
    pub fn wait_for_datagrams(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.state.lock().datagrams.len() >= count {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(2));
        }
    }
}

/// [`Connector`] whose links talk to a [`FakeNetwork`].
#[derive(Clone, Debug)]
pub struct FakeConnector {
    kind: TransportKind,
    network: FakeNetwork,
}

impl Connector for FakeConnector {
    type Link = FakeLink;

    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn resolve(&mut self, destination: &Destination) -> io::Result<SocketAddr> {
        let mut state = self.network.state.lock();
        state.resolve_calls += 1;
        if state.unresolvable {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no address found for {}", destination.host),
            ));
        }
        Ok(state.endpoint)
    }

    fn connect(&mut self, endpoint: SocketAddr) -> io::Result<FakeLink> {
        let mut state = self.network.state.lock();
        state.connect_attempts += 1;
        if !state.online {
            return Err(io::Error::from(io::ErrorKind::ConnectionRefused));
        }
        if state.fail_next_connects > 0 {
            state.fail_next_connects -= 1;
            return Err(io::Error::from(io::ErrorKind::ConnectionRefused));
        }
        state.connected_to.push(endpoint);
        state.connections.push(Vec::new());
        state.open_links += 1;
        Ok(FakeLink {
            kind: self.kind,
            network: self.network.clone(),
            connection: state.connections.len() - 1,
        })
    }
}

/// One simulated socket. Dropping it closes the connection.
#[derive(Debug)]
pub struct FakeLink {
    kind: TransportKind,
    network: FakeNetwork,
    connection: usize,
}

impl FakeLink {
    fn send_datagram(&mut self, line: &[u8]) -> io::Result<()> {
        let mut state = self.network.state.lock();
        state.connections[self.connection].extend_from_slice(line);
        state.datagrams.push(line.to_vec());
        Ok(())
    }
}

impl Link for FakeLink {
    fn send_line(&mut self, line: &[u8]) -> io::Result<()> {
        {
            let mut state = self.network.state.lock();
            if !state.online {
                return Err(closed("network is offline"));
            }
            if state.fail_next_sends > 0 {
                state.fail_next_sends -= 1;
                return Err(closed("injected send failure"));
            }
        }
        match self.kind {
            TransportKind::Udp => self.send_datagram(line),
            TransportKind::Tcp => write_fully(self, line),
        }
    }
}

impl Write for FakeLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.network.state.lock();
        if state.interrupt_next_writes > 0 {
            state.interrupt_next_writes -= 1;
            return Err(io::Error::from(io::ErrorKind::Interrupted));
        }
        let mut accepted = buf.len();
        if let Some(chunk) = state.max_chunk {
            accepted = accepted.min(chunk);
        }
        if let Some(budget) = state.byte_budget.as_mut() {
            if *budget == 0 {
                return Err(io::Error::from(io::ErrorKind::ConnectionReset));
            }
            accepted = accepted.min(*budget);
            *budget -= accepted;
        }
        state.connections[self.connection].extend_from_slice(&buf[..accepted]);
        Ok(accepted)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for FakeLink {
    fn drop(&mut self) {
        let mut state = self.network.state.lock();
        state.open_links = state.open_links.saturating_sub(1);
    }
}
