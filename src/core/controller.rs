//! The sync controller.
//!
//! One owned object wires the cache, client cache, registry, scheduler and
//! diff watcher together. Build it with [`SyncController::builder`], then call
//! [`SyncController::init`] from inside a tokio runtime.
//!
//! ```rust,ignore
//! let controller = SyncController::builder()
//!     .transport(Arc::new(HttpTransport::new(&config.sync)?))
//!     .config(config.to_snapshot())
//!     .build()?;
//! controller.init()?;
//! controller.register(Registration::new("widget", "main", types, on_entry));
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::runtime::Handle;

use super::cache_store::CacheStore;
use super::client_cache::{ClientCache, CredentialValidator, RequiredFieldsValidator, Transport};
use super::clock::{Clock, SystemClock};
use super::config_diff::{ConfigDiff, DiffEngine, DiffHandler, DiffWatcher};
use super::models::{AccountId, Entry};
use super::orchestrator::{OrchestratorSet, fetch_all};
use super::registry::{RegisterOutcome, Registration, Registry};
use super::scheduler::{PairRefresher, PollScheduler, RefreshOutcome, SkipReason, TickOutcome};
use super::service::{DataType, Service};
use super::snapshot::{Account, ConfigSnapshot, Preferences};
use super::sync::{lock_or_recover, read_or_recover, write_or_recover};
use crate::error::{Result, SyncError};
use crate::services::default_orchestrators;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Timing knobs, fixed before `init()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub poll_interval: Duration,
    pub debounce: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Latest pushed configuration, read on demand when resolving accounts.
#[derive(Debug, Default)]
pub struct SettingsStore {
    snapshot: RwLock<ConfigSnapshot>,
}

impl SettingsStore {
    #[must_use]
    pub const fn new(snapshot: ConfigSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
        }
    }

    pub fn replace(&self, snapshot: ConfigSnapshot) {
        *write_or_recover(&self.snapshot) = snapshot;
    }

    #[must_use]
    pub fn current(&self) -> ConfigSnapshot {
        read_or_recover(&self.snapshot).clone()
    }

    #[must_use]
    pub fn account(&self, account_id: &str) -> Option<Account> {
        read_or_recover(&self.snapshot).account(account_id).cloned()
    }

    #[must_use]
    pub fn preferences(&self) -> Preferences {
        read_or_recover(&self.snapshot).preferences.clone()
    }
}

/// Shared state reached from the scheduler, the diff watcher and the controller.
struct SyncCore {
    cache: Arc<CacheStore>,
    registry: Arc<Registry>,
    clients: Arc<ClientCache>,
    orchestrators: OrchestratorSet,
    settings: SettingsStore,
    clock: Arc<dyn Clock>,
}

impl SyncCore {
    fn skip(account_id: &str, service: Service, reason: SkipReason) -> RefreshOutcome {
        tracing::info!(account = %account_id, service = %service, reason = %reason, "Skipping refresh");
        RefreshOutcome::Skipped(reason)
    }
}

#[async_trait]
impl PairRefresher for SyncCore {
    fn active_demand(&self) -> BTreeMap<AccountId, BTreeSet<Service>> {
        self.registry.active_demand()
    }

    async fn refresh_pair(&self, account_id: &str, service: Service) -> RefreshOutcome {
        let requested = self.registry.active_data_types(account_id, service);
        if requested.is_empty() {
            return RefreshOutcome::NoDemand;
        }
        let Some(account) = self.settings.account(account_id) else {
            return Self::skip(account_id, service, SkipReason::UnknownAccount);
        };
        let Some(external_id) = account.external_id(service) else {
            return Self::skip(account_id, service, SkipReason::MissingExternalId);
        };
        let Some(orchestrator) = self.orchestrators.get(service) else {
            return Self::skip(account_id, service, SkipReason::NoOrchestrator);
        };
        let Some(client) = self.clients.get_client(&account) else {
            return Self::skip(account_id, service, SkipReason::RejectedCredentials);
        };

        let results = fetch_all(
            orchestrator.as_ref(),
            client,
            external_id,
            &requested,
            self.clock.as_ref(),
        )
        .await;

        let committed = results.len();
        for (data_type, entry) in results {
            self.cache.set(account_id, data_type, entry);
        }
        RefreshOutcome::Committed(committed)
    }
}

impl DiffHandler for SyncCore {
    fn apply(&self, diff: &ConfigDiff) {
        for account_id in &diff.invalidate {
            self.cache.invalidate_account(account_id);
        }
        if diff.renotify {
            self.registry.renotify(&self.cache);
        }
    }
}

/// Builder for [`SyncController`].
#[derive(Default)]
pub struct SyncControllerBuilder {
    transport: Option<Arc<dyn Transport>>,
    validator: Option<Arc<dyn CredentialValidator>>,
    clock: Option<Arc<dyn Clock>>,
    orchestrators: Option<OrchestratorSet>,
    settings: SyncSettings,
    config: ConfigSnapshot,
}

impl SyncControllerBuilder {
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn validator(mut self, validator: Arc<dyn CredentialValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replace the default set of all built-in services.
    #[must_use]
    pub fn orchestrators(mut self, orchestrators: OrchestratorSet) -> Self {
        self.orchestrators = Some(orchestrators);
        self
    }

    #[must_use]
    pub const fn settings(mut self, settings: SyncSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Initial configuration; also the baseline for the first diff.
    #[must_use]
    pub fn config(mut self, config: ConfigSnapshot) -> Self {
        self.config = config;
        self
    }

    /// # Errors
    /// Returns [`SyncError::Config`] when no transport was supplied.
    pub fn build(self) -> Result<SyncController> {
        let transport = self
            .transport
            .ok_or_else(|| SyncError::Config("sync controller needs a transport".to_string()))?;
        let validator = self
            .validator
            .unwrap_or_else(|| Arc::new(RequiredFieldsValidator));
        let clients = Arc::new(ClientCache::new(transport, validator));
        let cache = Arc::new(CacheStore::new(Arc::clone(&clients)));
        let registry = Arc::new(Registry::new());
        cache.set_listener(registry.clone());

        let core = Arc::new(SyncCore {
            cache,
            registry,
            clients,
            orchestrators: self.orchestrators.unwrap_or_else(default_orchestrators),
            settings: SettingsStore::new(self.config.clone()),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        });
        let scheduler = PollScheduler::new(core.clone(), self.settings.poll_interval);

        Ok(SyncController {
            core,
            scheduler,
            diff_watcher: DiffWatcher::new(),
            baseline: Mutex::new(Some(self.config)),
            settings: self.settings,
            runtime: OnceLock::new(),
        })
    }
}

/// Owns every piece of the sync pipeline.
pub struct SyncController {
    core: Arc<SyncCore>,
    scheduler: PollScheduler,
    diff_watcher: DiffWatcher,
    baseline: Mutex<Option<ConfigSnapshot>>,
    settings: SyncSettings,
    runtime: OnceLock<Handle>,
}

impl SyncController {
    #[must_use]
    pub fn builder() -> SyncControllerBuilder {
        SyncControllerBuilder::default()
    }

    /// Capture the current runtime and start background tasks.
    ///
    /// Polling starts right away if consumers registered before `init()`.
    ///
    /// # Errors
    /// Returns [`SyncError::RuntimeUnavailable`] outside a tokio runtime.
    pub fn init(&self) -> Result<()> {
        let handle = Handle::try_current().map_err(|e| SyncError::RuntimeUnavailable(e.to_string()))?;
        if self.runtime.set(handle.clone()).is_err() {
            tracing::warn!("Sync controller already initialized");
            return Ok(());
        }

        let baseline = lock_or_recover(&self.baseline).take();
        self.diff_watcher.start(
            &handle,
            DiffEngine::new(baseline),
            self.core.clone(),
            self.settings.debounce,
        );
        self.scheduler.start(&handle);
        tracing::info!(
            poll_interval_secs = self.settings.poll_interval.as_secs(),
            debounce_ms = u64::try_from(self.settings.debounce.as_millis()).unwrap_or(u64::MAX),
            "Sync controller initialized"
        );
        Ok(())
    }

    /// Stop polling and config diffing. Registrations and cache survive.
    pub fn shutdown(&self) {
        self.scheduler.stop();
        self.diff_watcher.stop();
        tracing::info!("Sync controller shut down");
    }

    /// Register or replace a consumer, replaying cached entries to it.
    pub fn register(&self, registration: Registration) -> RegisterOutcome {
        let outcome = self.core.registry.register(registration, &self.core.cache);
        self.scheduler.reconcile(self.runtime.get());
        outcome
    }

    /// Remove a consumer. Polling stops with the last one.
    pub fn unregister(&self, consumer_id: &str) -> bool {
        let removed = self.core.registry.unregister(consumer_id);
        self.scheduler.reconcile(self.runtime.get());
        removed
    }

    #[must_use]
    pub fn registration(&self, consumer_id: &str) -> Option<(AccountId, Vec<DataType>)> {
        self.core.registry.registration(consumer_id)
    }

    /// Refresh one pair now, outside the timer. May overlap a tick.
    pub async fn request_update(&self, account_id: &str, service: Service) -> RefreshOutcome {
        self.core.refresh_pair(account_id, service).await
    }

    /// Run one scheduler tick now.
    pub async fn tick_now(&self) -> TickOutcome {
        self.scheduler.tick().await
    }

    /// Make `snapshot` current for account lookups and queue it for diffing.
    ///
    /// Fetches started before the debounced diff lands already use the new
    /// credentials; their entries are then dropped with the account's
    /// invalidation and refetched on the next tick.
    pub fn push_config(&self, snapshot: ConfigSnapshot) {
        self.core.settings.replace(snapshot.clone());
        self.diff_watcher.push(snapshot);
    }

    #[must_use]
    pub fn current_config(&self) -> ConfigSnapshot {
        self.core.settings.current()
    }

    #[must_use]
    pub fn preferences(&self) -> Preferences {
        self.core.settings.preferences()
    }

    #[must_use]
    pub fn cached(&self, account_id: &str, data_type: DataType) -> Option<Entry> {
        self.core.cache.get(account_id, data_type)
    }

    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.scheduler.is_running()
    }

    #[must_use]
    pub const fn settings(&self) -> SyncSettings {
        self.settings
    }
}

impl std::fmt::Debug for SyncController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncController")
            .field("settings", &self.settings)
            .field("registrations", &self.core.registry.len())
            .field("cached_entries", &self.core.cache.len())
            .field("polling", &self.is_polling())
            .finish_non_exhaustive()
    }
}
