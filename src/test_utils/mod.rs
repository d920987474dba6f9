//! Test doubles shared by the crate's unit and integration tests.
//!
//! Compiled for unit tests and behind the `test-util` feature so the
//! integration tests under `tests/` can drive workers without a network.

mod collecting_console;
mod fake_network;
mod recording_pacer;

pub use collecting_console::CollectingConsole;
pub use fake_network::{FakeConnector, FakeLink, FakeNetwork};
pub use recording_pacer::RecordingPacer;
