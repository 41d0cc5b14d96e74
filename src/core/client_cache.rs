//! Per-account API clients.
//!
//! Building a client means validating credentials and binding them to the
//! shared transport. Clients are built lazily, once per account, and dropped
//! when the account is invalidated.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::models::{AccountId, Payload};
use super::service::{DataType, Service};
use super::snapshot::{Account, Credentials};
use super::sync::lock_or_recover;
use crate::error::{Result, SyncError};

/// One outbound call to a service endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub data_type: DataType,
    /// Path relative to the API base URL.
    pub path: &'static str,
    pub query: Vec<(&'static str, String)>,
}

impl ApiRequest {
    #[must_use]
    pub const fn service(&self) -> Service {
        self.data_type.service()
    }
}

/// Performs a named operation against the remote API.
///
/// Request signing and header construction live behind this seam.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, credentials: &Credentials, request: &ApiRequest) -> Result<Payload>;
}

/// Structural credential check, run before a client is built.
pub trait CredentialValidator: Send + Sync {
    /// # Errors
    /// Returns [`SyncError::AuthInvalid`] describing the first problem found.
    fn validate(&self, account_id: &str, credentials: &Credentials) -> Result<()>;
}

/// Default validator: the three primary fields must be present and `ltuid_v2`
/// must be numeric.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiredFieldsValidator;

impl CredentialValidator for RequiredFieldsValidator {
    fn validate(&self, account_id: &str, credentials: &Credentials) -> Result<()> {
        let required = [
            ("ltoken_v2", &credentials.ltoken_v2),
            ("ltuid_v2", &credentials.ltuid_v2),
            ("ltmid_v2", &credentials.ltmid_v2),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(SyncError::AuthInvalid {
                    account: account_id.to_string(),
                    reason: format!("missing {name}"),
                });
            }
        }
        if !credentials.ltuid_v2.chars().all(|c| c.is_ascii_digit()) {
            return Err(SyncError::AuthInvalid {
                account: account_id.to_string(),
                reason: "ltuid_v2 must be numeric".to_string(),
            });
        }
        Ok(())
    }
}

/// Authenticated client bound to one account.
pub struct ApiClient {
    account_id: AccountId,
    credentials: Credentials,
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    #[must_use]
    pub fn new(account: &Account, transport: Arc<dyn Transport>) -> Self {
        Self {
            account_id: account.id.clone(),
            credentials: account.credentials.clone(),
            transport,
        }
    }

    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Perform one request with this account's credentials.
    ///
    /// # Errors
    /// Propagates whatever the transport reports.
    pub async fn perform(&self, request: &ApiRequest) -> Result<Payload> {
        self.transport.call(&self.credentials, request).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("account_id", &self.account_id)
            .field("credentials", &self.credentials.fingerprint())
            .finish_non_exhaustive()
    }
}

/// Memoized clients, one per account.
pub struct ClientCache {
    clients: Mutex<HashMap<AccountId, Arc<ApiClient>>>,
    transport: Arc<dyn Transport>,
    validator: Arc<dyn CredentialValidator>,
}

impl ClientCache {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, validator: Arc<dyn CredentialValidator>) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            transport,
            validator,
        }
    }

    /// Return the memoized client for `account`, building it on first use.
    ///
    /// A memoized client whose credentials no longer match `account` is
    /// replaced. Returns `None` when the credentials fail validation.
    pub fn get_client(&self, account: &Account) -> Option<Arc<ApiClient>> {
        let mut clients = lock_or_recover(&self.clients);
        if let Some(client) = clients.get(&account.id) {
            if !client.credentials.differs_from(&account.credentials) {
                return Some(Arc::clone(client));
            }
            tracing::debug!(account = %account.id, "Credentials changed, rebuilding client");
            clients.remove(&account.id);
        }

        if let Err(e) = self.validator.validate(&account.id, &account.credentials) {
            tracing::warn!(account = %account.id, error = %e, "Credentials rejected, no client built");
            return None;
        }

        let client = Arc::new(ApiClient::new(account, Arc::clone(&self.transport)));
        tracing::debug!(
            account = %account.id,
            credentials = %account.credentials.fingerprint(),
            "Built API client"
        );
        clients.insert(account.id.clone(), Arc::clone(&client));
        Some(client)
    }

    /// Drop the client for one account. Returns whether one was cached.
    pub fn invalidate(&self, account_id: &str) -> bool {
        lock_or_recover(&self.clients).remove(account_id).is_some()
    }

    #[must_use]
    pub fn contains(&self, account_id: &str) -> bool {
        lock_or_recover(&self.clients).contains_key(account_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock_or_recover(&self.clients).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
