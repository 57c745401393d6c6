//! Shared helpers for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use joyemu_core::{EngineConfig, MockTransport, OutputReport, ProtocolEngine, RecordingObserver};

pub const MAC: [u8; 6] = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF];

/// Long enough that the handshake report never shows up during a test.
pub const NO_BOOTSTRAP_MS: u64 = 60_000;

pub fn start(
    config: EngineConfig,
) -> (ProtocolEngine<RecordingObserver>, MockTransport, Arc<RecordingObserver>) {
    start_with(MockTransport::new(), config)
}

/// Start over a transport the test has already scripted.
pub fn start_with(
    mock: MockTransport,
    config: EngineConfig,
) -> (ProtocolEngine<RecordingObserver>, MockTransport, Arc<RecordingObserver>) {
    let observer = Arc::new(RecordingObserver::new());
    let engine = ProtocolEngine::start(mock.clone(), None, MAC, config, Arc::clone(&observer))
        .expect("engine should start");
    (engine, mock, observer)
}

pub fn quiet_config() -> EngineConfig {
    EngineConfig {
        bootstrap_delay_ms: NO_BOOTSTRAP_MS,
        ..Default::default()
    }
}

pub fn subcommand(id: u8, payload: &[u8]) -> Vec<u8> {
    OutputReport::rumble_and_subcommand(0, id, payload)
        .as_bytes()
        .to_vec()
}

/// Poll until `cond` holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

/// Wait for at least `count` captured writes and return them all.
pub fn wait_for_writes(mock: &MockTransport, count: usize) -> Vec<Vec<u8>> {
    assert!(
        wait_until(Duration::from_secs(5), || mock.get_writes().len() >= count),
        "expected {} writes, got {}",
        count,
        mock.get_writes().len()
    );
    mock.get_writes()
}
