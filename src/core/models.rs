//! Cache payload types.
//!
//! An [`Entry`] is the last known state of one `(account, data type)` pair:
//! either the data returned by the service or the reason it could not be
//! fetched. Entries are immutable and replaced wholesale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Account identifier as used in configuration.
pub type AccountId = String;

/// Consumer (widget) identifier.
pub type ConsumerId = String;

/// Raw `data` object returned by the service.
pub type Payload = serde_json::Value;

/// Service return codes meaning the session is no longer valid.
pub const AUTH_RETCODES: &[i64] = &[-100, 10001, 10103];

/// Service return codes meaning the caller should back off.
pub const RATE_LIMIT_RETCODES: &[i64] = &[10101, 1034];

/// Consumer-facing failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Credentials rejected or expired. Retrying on schedule will not help.
    Auth,
    /// The service asked us to slow down.
    RateLimit,
    /// Anything else.
    Generic,
}

impl ErrorKind {
    /// Classify a service-level return code.
    #[must_use]
    pub fn from_retcode(code: i64) -> Option<Self> {
        if AUTH_RETCODES.contains(&code) {
            Some(Self::Auth)
        } else if RATE_LIMIT_RETCODES.contains(&code) {
            Some(Self::RateLimit)
        } else {
            None
        }
    }

    /// Classify an HTTP status code.
    #[must_use]
    pub const fn from_http_status(status: u16) -> Option<Self> {
        match status {
            401 | 403 => Some(Self::Auth),
            429 => Some(Self::RateLimit),
            _ => None,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::RateLimit => "rate-limit",
            Self::Generic => "generic",
        }
    }
}

/// Last known result for one account and data type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Entry<T = Payload> {
    /// The fetch succeeded.
    #[serde(rename_all = "camelCase")]
    Ok { data: T, fetched_at: DateTime<Utc> },
    /// The fetch failed.
    #[serde(rename_all = "camelCase")]
    Err {
        kind: ErrorKind,
        message: String,
        fetched_at: DateTime<Utc>,
    },
}

impl<T> Entry<T> {
    /// Build a success entry.
    #[must_use]
    pub const fn ok(data: T, fetched_at: DateTime<Utc>) -> Self {
        Self::Ok { data, fetched_at }
    }

    /// Build a failure entry from a fetch error.
    #[must_use]
    pub fn from_error(error: &SyncError, fetched_at: DateTime<Utc>) -> Self {
        Self::Err {
            kind: error.kind(),
            message: error.to_string(),
            fetched_at,
        }
    }

    /// When the underlying fetch settled.
    #[must_use]
    pub const fn fetched_at(&self) -> DateTime<Utc> {
        match self {
            Self::Ok { fetched_at, .. } | Self::Err { fetched_at, .. } => *fetched_at,
        }
    }

    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// Failure kind, if this is an error entry.
    #[must_use]
    pub const fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Ok { .. } => None,
            Self::Err { kind, .. } => Some(*kind),
        }
    }

    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        match self {
            Self::Ok { data, .. } => Some(data),
            Self::Err { .. } => None,
        }
    }
}
