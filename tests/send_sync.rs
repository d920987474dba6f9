//! Send/Sync guarantees for core types.

use netlogging::{
    Channel, DropCounter, LogLine, NetLogAdapter, NetLogRouter, Registry, TransportConfig,
    TransportConfigBuilder, TransportHandle, TransportWorker,
    channel::{MessageChannel, RingChannel},
    test_utils::{FakeConnector, RecordingPacer},
    transport::{TcpConnector, UdpConnector},
    worker::ThreadPacer,
};
use rstest::rstest;
use static_assertions::assert_impl_all;

#[rstest]
fn shared_pipeline_types_are_send_sync() {
    assert_impl_all!(Channel: Send, Sync);
    assert_impl_all!(RingChannel: Send, Sync);
    assert_impl_all!(MessageChannel: Send, Sync);
    assert_impl_all!(DropCounter: Send, Sync);
    assert_impl_all!(Registry: Send, Sync);
    assert_impl_all!(NetLogRouter<'static>: Send, Sync);
    assert_impl_all!(NetLogAdapter<'static>: Send, Sync);
    assert_impl_all!(TransportHandle: Send, Sync);
    assert_impl_all!(LogLine: Send, Sync);
}

#[rstest]
fn configuration_is_send_sync() {
    assert_impl_all!(TransportConfig: Send, Sync);
    assert_impl_all!(TransportConfigBuilder: Send, Sync);
}

#[rstest]
fn workers_can_move_to_their_thread() {
    assert_impl_all!(TransportWorker<UdpConnector, ThreadPacer>: Send);
    assert_impl_all!(TransportWorker<TcpConnector, ThreadPacer>: Send);
    assert_impl_all!(TransportWorker<FakeConnector, RecordingPacer>: Send);
}
