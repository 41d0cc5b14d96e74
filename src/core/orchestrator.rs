//! Per-service fetch orchestration.
//!
//! Every service declares a fixed table of operations, one per data type.
//! [`fetch_all`] runs the requested subset concurrently and never lets one
//! failing operation discard the result of another: each outcome becomes its
//! own [`Entry`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};

use super::client_cache::{ApiClient, ApiRequest};
use super::clock::Clock;
use super::models::{Entry, Payload};
use super::service::{DataType, Service};
use crate::error::Result;

/// A zero-argument fetch, already bound to a client and a uid.
pub type FetchFn = Box<dyn FnOnce() -> BoxFuture<'static, Result<Payload>> + Send>;

/// One row of a service's operation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub data_type: DataType,
    /// Path relative to the API base URL.
    pub path: &'static str,
    /// Fixed query parameters in addition to `role_id` and `server`.
    pub query: &'static [(&'static str, &'static str)],
}

/// Shared contract of every service.
pub trait Orchestrator: Send + Sync {
    fn service(&self) -> Service;

    /// Fixed operation table.
    fn operations(&self) -> &'static [Operation];

    /// Game server (region) a player uid lives on.
    fn server_for(&self, external_id: &str) -> &'static str;

    /// Build the request for one operation.
    fn request(&self, operation: &Operation, external_id: &str) -> ApiRequest {
        let mut query = vec![
            ("role_id", external_id.to_string()),
            ("server", self.server_for(external_id).to_string()),
        ];
        query.extend(
            operation
                .query
                .iter()
                .map(|(name, value)| (*name, (*value).to_string())),
        );
        ApiRequest {
            data_type: operation.data_type,
            path: operation.path,
            query,
        }
    }
}

/// Bind the requested operations to a client, in table order.
#[must_use]
pub fn bind_operations(
    orchestrator: &dyn Orchestrator,
    client: &Arc<ApiClient>,
    external_id: &str,
    requested: &[DataType],
) -> Vec<(DataType, FetchFn)> {
    orchestrator
        .operations()
        .iter()
        .filter(|op| requested.contains(&op.data_type))
        .map(|op| {
            let request = orchestrator.request(op, external_id);
            let client = Arc::clone(client);
            let thunk: FetchFn =
                Box::new(move || async move { client.perform(&request).await }.boxed());
            (op.data_type, thunk)
        })
        .collect()
}

/// Run the requested operations concurrently and turn every outcome into an entry.
///
/// Entries are stamped with one `fetched_at`, taken after every operation settled.
pub async fn fetch_all(
    orchestrator: &dyn Orchestrator,
    client: Arc<ApiClient>,
    external_id: &str,
    requested: &[DataType],
    clock: &dyn Clock,
) -> BTreeMap<DataType, Entry> {
    let service = orchestrator.service();
    let (data_types, pending): (Vec<_>, Vec<_>) =
        bind_operations(orchestrator, &client, external_id, requested)
            .into_iter()
            .map(|(data_type, thunk)| (data_type, thunk()))
            .unzip();

    tracing::debug!(
        account = %client.account_id(),
        service = %service,
        operations = data_types.len(),
        "Fetching"
    );

    let results = join_all(pending).await;
    let fetched_at = clock.now();

    data_types
        .into_iter()
        .zip(results)
        .map(|(data_type, result)| {
            let entry = match result {
                Ok(data) => Entry::ok(data, fetched_at),
                Err(e) => {
                    tracing::warn!(
                        account = %client.account_id(),
                        data_type = %data_type,
                        code = e.error_code(),
                        category = %e.category(),
                        retryable = e.is_retryable(),
                        retry_after_secs = e.retry_after().map(|d| d.as_secs()),
                        error = %e,
                        "Fetch operation failed"
                    );
                    Entry::from_error(&e, fetched_at)
                }
            };
            (data_type, entry)
        })
        .collect()
}

/// Orchestrators keyed by service, registered once at startup.
#[derive(Clone, Default)]
pub struct OrchestratorSet {
    by_service: HashMap<Service, Arc<dyn Orchestrator>>,
}

impl OrchestratorSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the orchestrator for its service.
    pub fn insert(&mut self, orchestrator: Arc<dyn Orchestrator>) {
        self.by_service.insert(orchestrator.service(), orchestrator);
    }

    #[must_use]
    pub fn with(mut self, orchestrator: Arc<dyn Orchestrator>) -> Self {
        self.insert(orchestrator);
        self
    }

    #[must_use]
    pub fn get(&self, service: Service) -> Option<Arc<dyn Orchestrator>> {
        self.by_service.get(&service).cloned()
    }

    #[must_use]
    pub fn services(&self) -> Vec<Service> {
        let mut services: Vec<_> = self.by_service.keys().copied().collect();
        services.sort();
        services
    }
}

impl std::fmt::Debug for OrchestratorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestratorSet")
            .field("services", &self.services())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::SystemClock;
    use crate::core::models::ErrorKind;
    use crate::core::snapshot::Account;
    use crate::error::SyncError;
    use crate::services::genshin::GenshinOrchestrator;
    use crate::test_utils::{ScriptedTransport, make_test_account};
    use serde_json::json;

    fn client(transport: Arc<ScriptedTransport>) -> Arc<ApiClient> {
        let account: Account = make_test_account("acc1");
        Arc::new(ApiClient::new(&account, transport))
    }

    #[test]
    fn request_carries_uid_server_and_fixed_query() {
        let orchestrator = GenshinOrchestrator;
        let op = orchestrator
            .operations()
            .iter()
            .find(|op| op.data_type == DataType::GenshinSpiralAbyss)
            .unwrap();
        let request = orchestrator.request(op, "700000001");
        assert_eq!(request.service(), Service::Genshin);
        assert_eq!(
            request.query,
            vec![
                ("role_id", "700000001".to_string()),
                ("server", "os_euro".to_string()),
                ("schedule_type", "1".to_string()),
            ]
        );
    }

    #[test]
    fn bind_selects_only_requested_operations() {
        let transport = Arc::new(ScriptedTransport::new());
        let bound = bind_operations(
            &GenshinOrchestrator,
            &client(transport),
            "600000001",
            &[DataType::GenshinTheater, DataType::ZzzDailyNote],
        );
        let types: Vec<_> = bound.iter().map(|(dt, _)| *dt).collect();
        assert_eq!(types, vec![DataType::GenshinTheater]);
    }

    #[tokio::test]
    async fn partial_failure_keeps_sibling_successes() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(DataType::GenshinDailyNote, Ok(json!({"resin": 160})));
        transport.respond(
            DataType::GenshinSpiralAbyss,
            Err(SyncError::RateLimited {
                service: "genshin".to_string(),
                retry_after: None,
                message: "too many requests".to_string(),
            }),
        );

        let results = fetch_all(
            &GenshinOrchestrator,
            client(Arc::clone(&transport)),
            "600000001",
            &[DataType::GenshinDailyNote, DataType::GenshinSpiralAbyss],
            &SystemClock,
        )
        .await;

        assert_eq!(results.len(), 2);
        let note = &results[&DataType::GenshinDailyNote];
        assert_eq!(note.data(), Some(&json!({"resin": 160})));
        let abyss = &results[&DataType::GenshinSpiralAbyss];
        assert_eq!(abyss.error_kind(), Some(ErrorKind::RateLimit));
        assert_eq!(note.fetched_at(), abyss.fetched_at());
        assert_eq!(transport.total_calls(), 2);
    }

    #[tokio::test]
    async fn retcode_errors_are_classified() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            DataType::GenshinDailyNote,
            Err(SyncError::ApiError {
                service: "genshin".to_string(),
                code: Some(10001),
                status: Some(200),
                message: "Please login".to_string(),
            }),
        );
        let results = fetch_all(
            &GenshinOrchestrator,
            client(transport),
            "600000001",
            &[DataType::GenshinDailyNote],
            &SystemClock,
        )
        .await;
        assert_eq!(
            results[&DataType::GenshinDailyNote].error_kind(),
            Some(ErrorKind::Auth)
        );
    }

    #[test]
    fn set_lookup_by_service() {
        let set = OrchestratorSet::new().with(Arc::new(GenshinOrchestrator));
        assert!(set.get(Service::Genshin).is_some());
        assert!(set.get(Service::Zzz).is_none());
        assert_eq!(set.services(), vec![Service::Genshin]);
    }
}
