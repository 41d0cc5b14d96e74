//! Sync engine: cache, clients, orchestration, subscriptions and scheduling.

pub mod cache_store;
pub mod client_cache;
pub mod clock;
pub mod config_diff;
pub mod config_watcher;
pub mod controller;
pub mod http;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod registry;
pub mod scheduler;
pub mod service;
pub mod snapshot;
pub(crate) mod sync;

pub use cache_store::{CacheStore, EntryListener};
pub use client_cache::{
    ApiClient, ApiRequest, ClientCache, CredentialValidator, RequiredFieldsValidator, Transport,
};
pub use clock::{Clock, SystemClock};
pub use config_diff::{ConfigDiff, DiffEngine, DiffHandler, DiffWatcher};
pub use config_watcher::ConfigFileWatcher;
pub use controller::{SettingsStore, SyncController, SyncControllerBuilder, SyncSettings};
pub use http::HttpTransport;
pub use models::{AccountId, ConsumerId, Entry, ErrorKind, Payload};
pub use orchestrator::{FetchFn, Operation, Orchestrator, OrchestratorSet, fetch_all};
pub use registry::{NotifyFn, RegisterOutcome, Registration, Registry};
pub use scheduler::{PollScheduler, RefreshOutcome, SkipReason, TickOutcome};
pub use service::{DataType, Service};
pub use snapshot::{Account, BadgeLayout, BadgePosition, ConfigSnapshot, Credentials, Preferences};
