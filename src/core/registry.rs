//! Subscription registry.
//!
//! Tracks which consumer wants which data types for which account, replays
//! cached state on registration, and fans committed entries out to every
//! matching consumer.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use super::cache_store::{CacheStore, EntryListener};
use super::models::{AccountId, ConsumerId, Entry};
use super::service::{DataType, Service};
use super::sync::lock_or_recover;

/// Consumer callback. An `Err` is logged and does not affect other consumers.
pub type NotifyFn = Arc<dyn Fn(&str, DataType, &Entry) -> anyhow::Result<()> + Send + Sync>;

/// A consumer's declared interest.
#[derive(Clone)]
pub struct Registration {
    pub consumer_id: ConsumerId,
    pub account_id: AccountId,
    /// Requested types, in the consumer's order.
    pub data_types: Vec<DataType>,
    pub notify: NotifyFn,
}

impl Registration {
    pub fn new<F>(
        consumer_id: impl Into<ConsumerId>,
        account_id: impl Into<AccountId>,
        data_types: Vec<DataType>,
        notify: F,
    ) -> Self
    where
        F: Fn(&str, DataType, &Entry) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            consumer_id: consumer_id.into(),
            account_id: account_id.into(),
            data_types,
            notify: Arc::new(notify),
        }
    }

    fn same_interest(&self, account_id: &str, data_types: &[DataType]) -> bool {
        self.account_id == account_id && self.data_types == data_types
    }

    fn wants(&self, account_id: &str, data_type: DataType) -> bool {
        self.account_id == account_id && self.data_types.contains(&data_type)
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("consumer_id", &self.consumer_id)
            .field("account_id", &self.account_id)
            .field("data_types", &self.data_types)
            .finish_non_exhaustive()
    }
}

/// Result of [`Registry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// Same account and data types as the existing registration; nothing done.
    Unchanged,
    /// Stored (new or replaced); `replayed` cached entries were delivered.
    Registered { replayed: usize },
}

/// All current registrations, keyed by consumer.
#[derive(Default)]
pub struct Registry {
    registrations: Mutex<HashMap<ConsumerId, Registration>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a registration and replay whatever `cache` already holds for it.
    pub fn register(&self, registration: Registration, cache: &CacheStore) -> RegisterOutcome {
        {
            let mut registrations = lock_or_recover(&self.registrations);
            if let Some(existing) = registrations.get(&registration.consumer_id) {
                if existing.same_interest(&registration.account_id, &registration.data_types) {
                    tracing::trace!(consumer = %registration.consumer_id, "Registration unchanged");
                    return RegisterOutcome::Unchanged;
                }
            }
            registrations.insert(registration.consumer_id.clone(), registration.clone());
        }

        let mut replayed = 0;
        for data_type in &registration.data_types {
            if let Some(entry) = cache.get(&registration.account_id, *data_type) {
                deliver(&registration, *data_type, &entry);
                replayed += 1;
            }
        }

        tracing::debug!(
            consumer = %registration.consumer_id,
            account = %registration.account_id,
            data_types = registration.data_types.len(),
            replayed,
            "Consumer registered"
        );
        RegisterOutcome::Registered { replayed }
    }

    /// Remove a registration. Returns whether one existed.
    pub fn unregister(&self, consumer_id: &str) -> bool {
        let removed = lock_or_recover(&self.registrations)
            .remove(consumer_id)
            .is_some();
        if removed {
            tracing::debug!(consumer = %consumer_id, "Consumer unregistered");
        }
        removed
    }

    /// Current account and data types for a consumer.
    #[must_use]
    pub fn registration(&self, consumer_id: &str) -> Option<(AccountId, Vec<DataType>)> {
        lock_or_recover(&self.registrations)
            .get(consumer_id)
            .map(|r| (r.account_id.clone(), r.data_types.clone()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock_or_recover(&self.registrations).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Which services are wanted for which accounts.
    #[must_use]
    pub fn active_demand(&self) -> BTreeMap<AccountId, BTreeSet<Service>> {
        let mut demand: BTreeMap<AccountId, BTreeSet<Service>> = BTreeMap::new();
        for registration in lock_or_recover(&self.registrations).values() {
            let services = demand.entry(registration.account_id.clone()).or_default();
            services.extend(registration.data_types.iter().map(|dt| dt.service()));
        }
        demand.retain(|_, services| !services.is_empty());
        demand
    }

    /// Union of requested types for one account and service.
    #[must_use]
    pub fn active_data_types(&self, account_id: &str, service: Service) -> Vec<DataType> {
        let types: BTreeSet<DataType> = lock_or_recover(&self.registrations)
            .values()
            .filter(|r| r.account_id == account_id)
            .flat_map(|r| r.data_types.iter().copied())
            .filter(|dt| dt.service() == service)
            .collect();
        types.into_iter().collect()
    }

    /// Deliver one entry to every registration that asked for it.
    pub fn notify(&self, account_id: &str, data_type: DataType, entry: &Entry) {
        for registration in self.matching(account_id, data_type) {
            deliver(&registration, data_type, entry);
        }
    }

    /// Redeliver every cached entry to every matching registration.
    ///
    /// Returns the number of deliveries made.
    pub fn renotify(&self, cache: &CacheStore) -> usize {
        let registrations: Vec<Registration> = lock_or_recover(&self.registrations)
            .values()
            .cloned()
            .collect();

        let mut delivered = 0;
        for registration in &registrations {
            for data_type in &registration.data_types {
                if let Some(entry) = cache.get(&registration.account_id, *data_type) {
                    deliver(registration, *data_type, &entry);
                    delivered += 1;
                }
            }
        }
        tracing::debug!(delivered, "Replayed cached entries to consumers");
        delivered
    }

    fn matching(&self, account_id: &str, data_type: DataType) -> Vec<Registration> {
        lock_or_recover(&self.registrations)
            .values()
            .filter(|r| r.wants(account_id, data_type))
            .cloned()
            .collect()
    }
}

impl EntryListener for Registry {
    fn entry_updated(&self, account_id: &str, data_type: DataType, entry: &Entry) {
        self.notify(account_id, data_type, entry);
    }
}

fn deliver(registration: &Registration, data_type: DataType, entry: &Entry) {
    if let Err(e) = (registration.notify)(&registration.account_id, data_type, entry) {
        tracing::warn!(
            consumer = %registration.consumer_id,
            data_type = %data_type,
            error = %e,
            "Consumer notification failed"
        );
    }
}
