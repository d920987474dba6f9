//! End-to-end delivery over UDP to a loopback collector.

mod test_utils;

use netlogging::{LINE_CAPACITY, StartError, TransportKind, dropped_lines, start};
use rstest::rstest;
use serial_test::serial;

use test_utils::UdpCollector;

#[rstest]
#[serial]
fn log_calls_reach_the_collector_as_single_datagrams() {
    let collector = UdpCollector::bind();
    let handle = start(TransportKind::Udp, "127.0.0.1", collector.port(), false)
        .expect("udp transport starts");
    assert_eq!(handle.kind(), TransportKind::Udp);
    assert_eq!(handle.endpoint().port(), collector.port());

    log::info!(target: "relays", "relay {} switched on", 4);
    let seen = collector
        .recv_until("relay 4 switched on")
        .expect("line delivered");
    let line = seen.last().expect("at least one datagram");
    assert!(line.starts_with("I ("), "unexpected line {line:?}");
    assert!(line.ends_with(") relays: relay 4 switched on\n"), "unexpected line {line:?}");

    log::debug!("below the default level");
    log::warn!("{}", "x".repeat(2 * LINE_CAPACITY));
    let seen = collector.recv_until("xxxxxxxx").expect("long line delivered");
    assert!(seen.iter().all(|line| !line.contains("below the default level")));
    let long = seen.last().expect("long datagram");
    assert_eq!(long.len(), LINE_CAPACITY);
    assert!(long.starts_with("W ("));
    assert!(long.ends_with("x\n"));

    log::error!("marker");
    collector.recv_until("marker").expect("marker delivered");
    assert_eq!(dropped_lines(TransportKind::Udp), Some(handle.dropped()));
    assert_eq!(dropped_lines(TransportKind::Tcp), None);

    let second = start(TransportKind::Udp, "127.0.0.1", collector.port(), false);
    assert!(matches!(second, Err(StartError::AlreadyActive(TransportKind::Udp))));
}
