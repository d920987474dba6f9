use std::{
    io::{self, Read, Write},
    net::{SocketAddr, TcpListener, UdpSocket},
    thread,
    time::Duration,
};

use rstest::{fixture, rstest};

use super::*;

/// Writer that accepts a limited number of bytes per call and can be told to
/// fail or report a closed peer after a number of calls.
struct ScriptedWriter {
    written: Vec<u8>,
    chunk: usize,
    calls: usize,
    interrupt_on: Option<usize>,
    zero_on: Option<usize>,
    fail_on: Option<usize>,
}

impl ScriptedWriter {
    fn new(chunk: usize) -> Self {
        Self {
            written: Vec::new(),
            chunk,
            calls: 0,
            interrupt_on: None,
            zero_on: None,
            fail_on: None,
        }
    }
}

impl Write for ScriptedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let call = self.calls;
        self.calls += 1;
        if self.interrupt_on == Some(call) {
            return Err(io::Error::from(io::ErrorKind::Interrupted));
        }
        if self.zero_on == Some(call) {
            return Ok(0);
        }
        if self.fail_on == Some(call) {
            return Err(io::Error::from(io::ErrorKind::ConnectionReset));
        }
        let n = buf.len().min(self.chunk);
        self.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[rstest]
fn write_fully_continues_after_partial_writes() {
    let mut writer = ScriptedWriter::new(3);
    write_fully(&mut writer, b"partial writes\n").expect("all bytes written");
    assert_eq!(writer.written, b"partial writes\n");
    assert_eq!(writer.calls, 5);
}

#[rstest]
fn write_fully_retries_interrupted_writes() {
    let mut writer = ScriptedWriter::new(64);
    writer.interrupt_on = Some(0);
    write_fully(&mut writer, b"again\n").expect("interrupted write retried");
    assert_eq!(writer.written, b"again\n");
}

#[rstest]
fn write_fully_reports_closed_peer() {
    let mut writer = ScriptedWriter::new(4);
    writer.zero_on = Some(1);
    let err = write_fully(&mut writer, b"closed early\n").expect_err("zero write fails");
    assert_eq!(err.kind(), io::ErrorKind::WriteZero);
    assert_eq!(writer.written, b"clos");
}

#[rstest]
fn write_fully_propagates_errors() {
    let mut writer = ScriptedWriter::new(4);
    writer.fail_on = Some(0);
    let err = write_fully(&mut writer, b"reset\n").expect_err("error propagates");
    assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
}

#[rstest]
#[case(10, 10, true)]
#[case(9, 10, false)]
#[case(0, 10, false)]
fn datagram_must_be_sent_whole(#[case] sent: usize, #[case] expected: usize, #[case] ok: bool) {
    assert_eq!(check_datagram(sent, expected).is_ok(), ok);
}

#[rstest]
#[case("192.168.1.20", 514, "192.168.1.20:514")]
#[case("::1", 6514, "[::1]:6514")]
fn numeric_destinations_skip_name_resolution(
    #[case] host: &str,
    #[case] port: u16,
    #[case] expected: &str,
) {
    let addr = Destination::new(host, port).resolve().expect("numeric address");
    assert_eq!(addr, expected.parse::<SocketAddr>().expect("valid literal"));
}

#[rstest]
fn hostnames_fall_back_to_name_resolution() {
    let addr = Destination::new("localhost", 514)
        .resolve()
        .expect("localhost resolves");
    assert!(addr.ip().is_loopback());
    assert_eq!(addr.port(), 514);
}

#[rstest]
#[case("udp", Some(TransportKind::Udp))]
#[case("TCP", Some(TransportKind::Tcp))]
#[case("stream", Some(TransportKind::Tcp))]
#[case("mqtt", None)]
fn transport_kind_parses_names(#[case] input: &str, #[case] expected: Option<TransportKind>) {
    assert_eq!(input.parse::<TransportKind>().ok(), expected);
}

#[fixture]
fn udp_collector() -> UdpSocket {
    let socket = UdpSocket::bind(("127.0.0.1", 0)).expect("bind collector");
    socket
        .set_read_timeout(Some(Duration::from_secs(2)))
        .expect("set read timeout");
    socket
}

#[rstest]
fn udp_link_sends_one_datagram_per_line(udp_collector: UdpSocket) {
    let endpoint = udp_collector.local_addr().expect("collector address");
    let mut connector = UdpConnector::new(Duration::from_secs(1));
    let mut link = connector.connect(endpoint).expect("open udp socket");
    link.send_line(b"first\n").expect("send first");
    link.send_line(b"second\n").expect("send second");

    let mut buf = [0u8; 64];
    let n = udp_collector.recv(&mut buf).expect("first datagram");
    assert_eq!(&buf[..n], b"first\n");
    let n = udp_collector.recv(&mut buf).expect("second datagram");
    assert_eq!(&buf[..n], b"second\n");
}

#[rstest]
fn tcp_link_streams_lines_in_order() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
    let endpoint = listener.local_addr().expect("listener address");
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept connection");
        let mut received = Vec::new();
        stream.read_to_end(&mut received).expect("read stream");
        received
    });

    let mut connector = TcpConnector::new(Duration::from_secs(1), Duration::from_secs(1));
    let mut link = connector.connect(endpoint).expect("connect");
    link.send_line(b"one\n").expect("send one");
    link.send_line(b"two\n").expect("send two");
    drop(link);

    let received = server.join().expect("server thread panicked");
    assert_eq!(received, b"one\ntwo\n");
}

#[rstest]
fn tcp_connect_to_closed_port_fails() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
    let endpoint = listener.local_addr().expect("listener address");
    drop(listener);
    let mut connector = TcpConnector::new(Duration::from_millis(500), Duration::from_secs(1));
    assert!(connector.connect(endpoint).is_err());
}
