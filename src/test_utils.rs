//! Test utilities for feedsync.
//!
//! Provides a scripted transport, a recording consumer, a fixed clock and
//! data factories for use across unit and integration tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use feedsync::test_utils::*;
//!
//! let transport = Arc::new(ScriptedTransport::new());
//! transport.respond(DataType::GenshinDailyNote, Ok(json!({"resin": 160})));
//! let snapshot = make_test_snapshot(&["acc1"]);
//! ```

use std::collections::HashMap;
use std::fs;
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde_json::json;

use crate::core::client_cache::{ApiRequest, Transport};
use crate::core::clock::Clock;
use crate::core::models::{Entry, Payload};
use crate::core::registry::Registration;
use crate::core::service::{DataType, Service};
use crate::core::snapshot::{Account, ConfigSnapshot, Credentials};
use crate::error::{Result, SyncError};

// =============================================================================
// Scripted Transport
// =============================================================================

/// In-memory [`Transport`] answering from a per-data-type script.
///
/// Unscripted data types answer `Ok({"dataType": <key>})`. Every call is
/// recorded so tests can assert on fetch counts.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<HashMap<DataType, Result<Payload>>>,
    calls: Mutex<Vec<ApiRequest>>,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call for `data_type` with `response`.
    pub fn respond(&self, data_type: DataType, response: Result<Payload>) {
        self.script.lock().unwrap().insert(data_type, response);
    }

    /// Sleep for `delay` before answering. Works with paused tokio time.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    #[must_use]
    pub fn calls_for(&self, data_type: DataType) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.data_type == data_type)
            .count()
    }

    /// Every request received, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, data_type: DataType) -> Result<Payload> {
        match self.script.lock().unwrap().get(&data_type) {
            Some(Ok(payload)) => Ok(payload.clone()),
            Some(Err(e)) => Err(replay_error(e)),
            None => Ok(json!({ "dataType": data_type.key() })),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn call(&self, _credentials: &Credentials, request: &ApiRequest) -> Result<Payload> {
        self.calls.lock().unwrap().push(request.clone());
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.answer(request.data_type)
    }
}

/// `SyncError` is not `Clone`; rebuild the variants tests script.
fn replay_error(error: &SyncError) -> SyncError {
    match error {
        SyncError::AuthExpired { account } => SyncError::AuthExpired {
            account: account.clone(),
        },
        SyncError::AuthInvalid { account, reason } => SyncError::AuthInvalid {
            account: account.clone(),
            reason: reason.clone(),
        },
        SyncError::RateLimited {
            service,
            retry_after,
            message,
        } => SyncError::RateLimited {
            service: service.clone(),
            retry_after: *retry_after,
            message: message.clone(),
        },
        SyncError::ApiError {
            service,
            code,
            status,
            message,
        } => SyncError::ApiError {
            service: service.clone(),
            code: *code,
            status: *status,
            message: message.clone(),
        },
        SyncError::Timeout(secs) => SyncError::Timeout(*secs),
        other => SyncError::Network(other.to_string()),
    }
}

// =============================================================================
// Recording Consumer
// =============================================================================

/// One callback invocation seen by a [`RecordingConsumer`].
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub account_id: String,
    pub data_type: DataType,
    pub entry: Entry,
}

/// Consumer that records every notification it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingConsumer {
    seen: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingConsumer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registration whose callback appends to this recorder.
    #[must_use]
    pub fn registration(
        &self,
        consumer_id: &str,
        account_id: &str,
        data_types: Vec<DataType>,
    ) -> Registration {
        let seen = Arc::clone(&self.seen);
        Registration::new(consumer_id, account_id, data_types, move |account, dt, entry| {
            seen.lock().unwrap().push(Notification {
                account_id: account.to_string(),
                data_type: dt,
                entry: entry.clone(),
            });
            Ok(())
        })
    }

    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.seen.lock().unwrap().clear();
    }
}

// =============================================================================
// Fixed Clock
// =============================================================================

/// [`Clock`] that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    #[must_use]
    pub const fn new(at: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(at) }
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::new(Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// =============================================================================
// Test Data Factories
// =============================================================================

/// Credentials that pass the default validator.
#[must_use]
pub fn make_test_credentials(seed: &str) -> Credentials {
    Credentials {
        ltoken_v2: format!("v2_ltoken_{seed}"),
        ltuid_v2: "100200300".to_string(),
        ltmid_v2: format!("mid_{seed}"),
        cookie_token_v2: Some(format!("v2_cookie_{seed}")),
        account_id_v2: Some("100200300".to_string()),
        account_mid_v2: Some(format!("mid_{seed}")),
    }
}

/// An account with valid credentials and a uid for every service.
#[must_use]
pub fn make_test_account(id: &str) -> Account {
    Account::new(id, make_test_credentials(id))
        .with_uid(Service::Genshin, "600000001")
        .with_uid(Service::StarRail, "800000001")
        .with_uid(Service::Zzz, "1000000001")
}

/// A snapshot holding [`make_test_account`] for each id, default preferences.
#[must_use]
pub fn make_test_snapshot(ids: &[&str]) -> ConfigSnapshot {
    ids.iter()
        .fold(ConfigSnapshot::default(), |snapshot, id| {
            snapshot.with_account(make_test_account(id))
        })
}

/// Sample config TOML with one account.
#[must_use]
pub fn make_test_config_toml() -> String {
    r#"[sync]
poll_interval_secs = 300
debounce_ms = 500

[display]
animations = true

[display.badge]
enabled = true
position = "top-right"

[accounts.main]
ltoken_v2 = "v2_ltoken_main"
ltuid_v2 = "100200300"
ltmid_v2 = "mid_main"

[accounts.main.uids]
genshin = "600000001"
starrail = "800000001"
"#
    .to_string()
}

// =============================================================================
// Temporary Directories
// =============================================================================

/// An isolated temporary directory, removed on drop.
pub struct TestDir {
    inner: tempfile::TempDir,
}

impl TestDir {
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Write a file, creating parent directories as needed.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be created or written.
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.inner.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        let mut file = fs::File::create(&path).expect("Failed to create test file");
        file.write_all(content.as_bytes())
            .expect("Failed to write test file");
    }

    #[must_use]
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.inner.path().join(name)
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Environment
// =============================================================================

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Serialize tests that read or write process environment variables.
pub fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

// =============================================================================
// Assertion Macros
// =============================================================================

/// Assert that a string contains a substring.
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            haystack.contains(needle),
            "Expected string to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}
