//! Shared helpers for integration tests.
//!
//! - `logger`: structured per-test output

#![allow(dead_code)]

pub mod logger;

use std::sync::Arc;
use std::time::Duration;

use feedsync::core::controller::{SyncController, SyncSettings};
use feedsync::core::snapshot::ConfigSnapshot;
use feedsync::test_utils::{FixedClock, ScriptedTransport};

pub const POLL_INTERVAL: Duration = Duration::from_secs(300);
pub const DEBOUNCE: Duration = Duration::from_millis(500);

/// Controller over a scripted transport and a fixed clock.
pub fn controller_with(
    transport: &Arc<ScriptedTransport>,
    clock: &Arc<FixedClock>,
    config: ConfigSnapshot,
) -> SyncController {
    controller_with_interval(transport, clock, config, POLL_INTERVAL)
}

pub fn controller_with_interval(
    transport: &Arc<ScriptedTransport>,
    clock: &Arc<FixedClock>,
    config: ConfigSnapshot,
    poll_interval: Duration,
) -> SyncController {
    SyncController::builder()
        .transport(transport.clone())
        .clock(clock.clone())
        .settings(SyncSettings {
            poll_interval,
            debounce: DEBOUNCE,
        })
        .config(config)
        .build()
        .expect("controller builds with a transport")
}

/// Let spawned tasks run; with paused time this also advances the clock.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

/// Wait past the diff debounce window.
pub async fn past_debounce() {
    tokio::time::sleep(DEBOUNCE + Duration::from_millis(100)).await;
}
