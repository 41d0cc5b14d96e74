//! In-memory cache of last known results.
//!
//! Keyed by `(account, data type)`. Writes overwrite and then fan out to the
//! registered [`EntryListener`]; invalidation is always account-scoped and
//! also drops that account's API client.
//!
//! Nothing here touches the network or the disk.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use super::client_cache::ClientCache;
use super::models::{AccountId, Entry};
use super::service::DataType;
use super::sync::lock_or_recover;

/// Receives every committed entry.
pub trait EntryListener: Send + Sync {
    fn entry_updated(&self, account_id: &str, data_type: DataType, entry: &Entry);
}

/// Keyed store of [`Entry`] values.
pub struct CacheStore {
    entries: Mutex<HashMap<(AccountId, DataType), Entry>>,
    clients: Arc<ClientCache>,
    listener: OnceLock<Arc<dyn EntryListener>>,
}

impl CacheStore {
    #[must_use]
    pub fn new(clients: Arc<ClientCache>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clients,
            listener: OnceLock::new(),
        }
    }

    /// Attach the fan-out target. Only the first call has an effect.
    pub fn set_listener(&self, listener: Arc<dyn EntryListener>) {
        if self.listener.set(listener).is_err() {
            tracing::warn!("Cache listener already attached, ignoring");
        }
    }

    /// Last known entry for one account and data type.
    #[must_use]
    pub fn get(&self, account_id: &str, data_type: DataType) -> Option<Entry> {
        lock_or_recover(&self.entries)
            .get(&(account_id.to_string(), data_type))
            .cloned()
    }

    /// Overwrite the entry, then notify the listener.
    ///
    /// The map lock is released before the listener runs.
    pub fn set(&self, account_id: &str, data_type: DataType, entry: Entry) {
        lock_or_recover(&self.entries).insert((account_id.to_string(), data_type), entry.clone());
        tracing::trace!(account = %account_id, data_type = %data_type, ok = entry.is_ok(), "Cache entry stored");

        if let Some(listener) = self.listener.get() {
            listener.entry_updated(account_id, data_type, &entry);
        }
    }

    /// Remove every entry for `account_id` and its cached client.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_account(&self, account_id: &str) -> usize {
        let removed = {
            let mut entries = lock_or_recover(&self.entries);
            let before = entries.len();
            entries.retain(|(account, _), _| account != account_id);
            before - entries.len()
        };
        let had_client = self.clients.invalidate(account_id);
        tracing::info!(
            account = %account_id,
            entries = removed,
            client = had_client,
            "Invalidated account"
        );
        removed
    }

    /// Every cached entry for one account.
    #[must_use]
    pub fn entries_for(&self, account_id: &str) -> Vec<(DataType, Entry)> {
        let mut entries: Vec<_> = lock_or_recover(&self.entries)
            .iter()
            .filter(|((account, _), _)| account == account_id)
            .map(|((_, data_type), entry)| (*data_type, entry.clone()))
            .collect();
        entries.sort_by_key(|(data_type, _)| *data_type);
        entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock_or_recover(&self.entries).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
