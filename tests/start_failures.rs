//! Start-up failures leave the transport disabled.

use std::{net::TcpListener, time::Duration};

use netlogging::{
    ConfigError, NetLogConfig, NetLogKind, StartError, TransportConfigBuilder, TransportKind,
    dropped_lines, setup_remote_logging, start, start_with_config,
};
use rstest::rstest;
use serial_test::serial;

fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral listener");
    listener.local_addr().expect("listener address").port()
}

#[rstest]
#[serial]
fn unresolvable_host_is_reported() {
    let config = TransportConfigBuilder::new(TransportKind::Udp)
        .with_destination("collector.netlog.invalid", 514)
        .with_ready_timeout(Duration::from_secs(30))
        .build()
        .expect("valid configuration");
    let err = start_with_config(&config).expect_err("name cannot resolve");
    assert!(matches!(err, StartError::Resolve { .. }), "unexpected error {err}");
    assert_eq!(dropped_lines(TransportKind::Udp), None);
}

#[rstest]
#[serial]
fn refused_connection_times_out() {
    let config = TransportConfigBuilder::new(TransportKind::Tcp)
        .with_destination("127.0.0.1", closed_port())
        .with_ready_timeout(Duration::from_millis(200))
        .build()
        .expect("valid configuration");
    let err = start_with_config(&config).expect_err("nothing listens");
    assert!(
        matches!(err, StartError::NotReady { kind: TransportKind::Tcp, .. }),
        "unexpected error {err}"
    );
    assert_eq!(dropped_lines(TransportKind::Tcp), None);
}

#[rstest]
#[serial]
fn invalid_destination_is_a_configuration_error() {
    let err = start(TransportKind::Udp, " ", 514, true).expect_err("empty host");
    assert!(matches!(err, StartError::Config(ConfigError::InvalidConfig(_))));
}

#[rstest]
#[serial]
fn disabled_settings_start_nothing() {
    let handle = setup_remote_logging(&NetLogConfig::default()).expect("disabled is not an error");
    assert!(handle.is_none());
}

#[rstest]
#[serial]
fn mqtt_settings_are_unsupported() {
    let config = NetLogConfig {
        kind: NetLogKind::Mqtt,
        ..NetLogConfig::default()
    };
    let err = setup_remote_logging(&config).expect_err("mqtt unsupported");
    assert!(matches!(err, StartError::Unsupported(ref name) if name == "mqtt"));
}
