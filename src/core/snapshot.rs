//! Account and configuration snapshot types.
//!
//! A [`ConfigSnapshot`] is the complete pushed configuration: every account
//! with its credentials and per-service uids, plus the display preferences.
//! The diff watcher keeps its own copy purely for structural comparison.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::models::AccountId;
use super::service::Service;

/// Session credentials for one account.
///
/// `ltoken_v2`, `ltuid_v2` and `ltmid_v2` are required to build a client;
/// the remaining three are optional and derived from the login flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub ltoken_v2: String,
    pub ltuid_v2: String,
    pub ltmid_v2: String,
    pub cookie_token_v2: Option<String>,
    pub account_id_v2: Option<String>,
    pub account_mid_v2: Option<String>,
}

impl Credentials {
    /// Field-by-field comparison across all six credential attributes.
    ///
    /// A change in any one of them, including the optional ones, counts.
    #[must_use]
    pub fn differs_from(&self, other: &Self) -> bool {
        self.ltoken_v2 != other.ltoken_v2
            || self.ltuid_v2 != other.ltuid_v2
            || self.ltmid_v2 != other.ltmid_v2
            || self.cookie_token_v2 != other.cookie_token_v2
            || self.account_id_v2 != other.account_id_v2
            || self.account_mid_v2 != other.account_mid_v2
    }

    /// Cookie header value for the service.
    #[must_use]
    pub fn cookie_header(&self) -> String {
        let mut pairs = vec![
            format!("ltoken_v2={}", self.ltoken_v2),
            format!("ltuid_v2={}", self.ltuid_v2),
            format!("ltmid_v2={}", self.ltmid_v2),
        ];
        let optional = [
            ("cookie_token_v2", &self.cookie_token_v2),
            ("account_id_v2", &self.account_id_v2),
            ("account_mid_v2", &self.account_mid_v2),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                pairs.push(format!("{name}={value}"));
            }
        }
        pairs.join("; ")
    }

    /// Short stable fingerprint, safe to put in log lines.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.ltuid_v2.as_bytes());
        hasher.update(";");
        hasher.update(self.ltmid_v2.as_bytes());
        hasher.update(";");
        hasher.update(self.ltoken_v2.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..6])
    }
}

/// One configured account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub credentials: Credentials,
    /// Per-service player uid.
    #[serde(default)]
    pub uids: BTreeMap<Service, String>,
}

impl Account {
    #[must_use]
    pub fn new(id: impl Into<AccountId>, credentials: Credentials) -> Self {
        Self {
            id: id.into(),
            credentials,
            uids: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_uid(mut self, service: Service, uid: impl Into<String>) -> Self {
        self.uids.insert(service, uid.into());
        self
    }

    /// Player uid for a service, if configured.
    #[must_use]
    pub fn external_id(&self, service: Service) -> Option<&str> {
        self.uids.get(&service).map(String::as_str)
    }
}

/// Corner a status badge is drawn in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BadgePosition {
    #[default]
    TopRight,
    TopLeft,
    BottomRight,
    BottomLeft,
}

/// Badge layout options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BadgeLayout {
    pub enabled: bool,
    pub position: BadgePosition,
}

impl Default for BadgeLayout {
    fn default() -> Self {
        Self {
            enabled: true,
            position: BadgePosition::default(),
        }
    }
}

/// Rendering and behavior preferences. Changing these never needs a fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub animations_enabled: bool,
    pub badge: BadgeLayout,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            animations_enabled: true,
            badge: BadgeLayout::default(),
        }
    }
}

/// Full configuration as pushed by the settings collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub accounts: BTreeMap<AccountId, Account>,
    pub preferences: Preferences,
}

impl ConfigSnapshot {
    #[must_use]
    pub fn with_account(mut self, account: Account) -> Self {
        self.accounts.insert(account.id.clone(), account);
        self
    }

    #[must_use]
    pub fn with_preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = preferences;
        self
    }

    #[must_use]
    pub fn account(&self, id: &str) -> Option<&Account> {
        self.accounts.get(id)
    }
}
