//! Error types for feedsync.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! Errors are categorized into five main categories:
//! - **Authentication**: Credentials rejected, expired, or missing
//! - **Network**: Connection, timeout, or transport issues
//! - **Configuration**: Config file parsing, validation, or missing values
//! - **Service**: Rate limits and remote API failures
//! - **Internal**: Unexpected errors, bugs, or unclassified issues
//!
//! Each error has a stable error code (e.g., `FSYNC-A001`) for programmatic handling.
//! Consumers never see these directly: failed fetches are collapsed into an
//! [`ErrorKind`] on the cached entry via [`SyncError::kind`].

use std::time::Duration;
use thiserror::Error;

use crate::core::models::ErrorKind;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Authentication issues (expired, missing, invalid credentials).
    Authentication,
    /// Network issues (timeout, connection refused, transport failure).
    Network,
    /// Configuration issues (parse errors, invalid values, missing files).
    Configuration,
    /// Service-side issues (rate limits, API errors, unexpected payloads).
    Service,
    /// Internal errors (bugs, unexpected state, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Authentication => "Authentication error",
            Self::Network => "Network error",
            Self::Configuration => "Configuration error",
            Self::Service => "Service error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Authentication => "A",
            Self::Network => "N",
            Self::Configuration => "C",
            Self::Service => "S",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes for the CLI front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Parse/format errors, unknown data types, invalid configuration
    ParseError = 3,
    /// Timeout
    Timeout = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as Self
    }
}

/// Main error type for feedsync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    // ==========================================================================
    // Authentication errors (Category: Authentication)
    // ==========================================================================
    /// Session credentials expired and need to be replaced.
    #[error("authentication expired for account {account}")]
    AuthExpired { account: String },

    /// Credentials were rejected, either locally or by the service.
    #[error("invalid credentials for account {account}: {reason}")]
    AuthInvalid { account: String, reason: String },

    // ==========================================================================
    // Network errors (Category: Network)
    // ==========================================================================
    /// Request timed out.
    #[error("request timeout after {0}s")]
    Timeout(u64),

    /// Generic transport failure.
    #[error("network error: {0}")]
    Network(String),

    // ==========================================================================
    // Configuration errors (Category: Configuration)
    // ==========================================================================
    /// Error parsing configuration file.
    #[error("config parse error at {path}: {message}")]
    ConfigParse { path: String, message: String },

    /// Invalid value in configuration.
    #[error("invalid config value for '{key}': {message}")]
    ConfigInvalid {
        key: String,
        value: String,
        message: String,
    },

    /// Generic configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unknown data type key.
    #[error("unknown data type: {0}")]
    InvalidDataType(String),

    /// Unknown service identifier.
    #[error("unknown service: {0}")]
    InvalidService(String),

    /// Account not present in the current configuration.
    #[error("account not found: {0}")]
    AccountNotFound(String),

    // ==========================================================================
    // Service errors (Category: Service)
    // ==========================================================================
    /// Rate limited by the remote service.
    #[error("rate limited by {service}: {message}")]
    RateLimited {
        service: String,
        retry_after: Option<Duration>,
        message: String,
    },

    /// Remote API returned an error envelope or a non-success status.
    #[error("{service} API error: {message}")]
    ApiError {
        service: String,
        /// Service-level return code, when the envelope carried one.
        code: Option<i64>,
        /// HTTP status, when the failure was at the HTTP layer.
        status: Option<u16>,
        message: String,
    },

    /// Failed to parse a service response.
    #[error("failed to parse response: {0}")]
    ParseResponse(String),

    // ==========================================================================
    // Internal errors (Category: Internal)
    // ==========================================================================
    /// The controller was used outside of a tokio runtime.
    #[error("no async runtime available: {0}")]
    RuntimeUnavailable(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SyncError {
    /// Map error to a CLI exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_)
            | Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. }
            | Self::InvalidDataType(_)
            | Self::InvalidService(_)
            | Self::AccountNotFound(_)
            | Self::ParseResponse(_) => ExitCode::ParseError,

            Self::Timeout(_) => ExitCode::Timeout,

            Self::AuthExpired { .. }
            | Self::AuthInvalid { .. }
            | Self::Network(_)
            | Self::RateLimited { .. }
            | Self::ApiError { .. }
            | Self::RuntimeUnavailable(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => ExitCode::GeneralError,
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::AuthExpired { .. } | Self::AuthInvalid { .. } => ErrorCategory::Authentication,

            Self::Timeout(_) | Self::Network(_) => ErrorCategory::Network,

            Self::Config(_)
            | Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. }
            | Self::InvalidDataType(_)
            | Self::InvalidService(_)
            | Self::AccountNotFound(_) => ErrorCategory::Configuration,

            Self::RateLimited { .. } | Self::ApiError { .. } | Self::ParseResponse(_) => {
                ErrorCategory::Service
            }

            Self::RuntimeUnavailable(_) | Self::Io(_) | Self::Json(_) | Self::Other(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// Returns a stable error code for programmatic handling.
    ///
    /// Format: `FSYNC-{category}{number}`.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::AuthExpired { .. } => "FSYNC-A001",
            Self::AuthInvalid { .. } => "FSYNC-A002",

            Self::Timeout(_) => "FSYNC-N001",
            Self::Network(_) => "FSYNC-N099",

            Self::ConfigParse { .. } => "FSYNC-C001",
            Self::ConfigInvalid { .. } => "FSYNC-C002",
            Self::Config(_) => "FSYNC-C003",
            Self::InvalidDataType(_) => "FSYNC-C010",
            Self::InvalidService(_) => "FSYNC-C011",
            Self::AccountNotFound(_) => "FSYNC-C020",

            Self::RateLimited { .. } => "FSYNC-S001",
            Self::ApiError { .. } => "FSYNC-S002",
            Self::ParseResponse(_) => "FSYNC-S020",

            Self::RuntimeUnavailable(_) => "FSYNC-X010",
            Self::Io(_) => "FSYNC-X001",
            Self::Json(_) => "FSYNC-X002",
            Self::Other(_) => "FSYNC-X099",
        }
    }

    /// Whether the next scheduled poll may succeed without outside intervention.
    ///
    /// Auth failures are never retryable: they need new credentials first.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Network(_) | Self::RateLimited { .. } | Self::ApiError { .. }
        )
    }

    /// Suggested back-off for rate limits, if the service sent one.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Collapse this error into the consumer-facing [`ErrorKind`].
    ///
    /// Service return codes and HTTP statuses carried by [`SyncError::ApiError`]
    /// take part in the decision; anything unrecognized is `Generic`.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthExpired { .. } | Self::AuthInvalid { .. } => ErrorKind::Auth,
            Self::RateLimited { .. } => ErrorKind::RateLimit,
            Self::ApiError { code, status, .. } => code
                .and_then(ErrorKind::from_retcode)
                .or_else(|| status.and_then(ErrorKind::from_http_status))
                .unwrap_or(ErrorKind::Generic),
            _ => ErrorKind::Generic,
        }
    }
}

/// Result type alias for feedsync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: Option<i64>, status: Option<u16>) -> SyncError {
        SyncError::ApiError {
            service: "genshin".to_string(),
            code,
            status,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn error_category_code_prefix() {
        assert_eq!(ErrorCategory::Authentication.code_prefix(), "A");
        assert_eq!(ErrorCategory::Service.code_prefix(), "S");
        assert_eq!(ErrorCategory::Internal.code_prefix(), "X");
    }

    #[test]
    fn error_codes_follow_category_prefix() {
        let errors = vec![
            SyncError::AuthExpired {
                account: "a".to_string(),
            },
            SyncError::Timeout(5),
            SyncError::Config("x".to_string()),
            api_error(None, None),
            SyncError::Other(anyhow::anyhow!("x")),
        ];
        for err in errors {
            let expected = format!("FSYNC-{}", err.category().code_prefix());
            assert!(
                err.error_code().starts_with(&expected),
                "{} should start with {expected}",
                err.error_code()
            );
        }
    }

    #[test]
    fn auth_errors_classify_as_auth() {
        let err = SyncError::AuthInvalid {
            account: "main".to_string(),
            reason: "missing ltoken_v2".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert!(!err.is_retryable());
    }

    #[test]
    fn rate_limit_classifies_and_keeps_retry_after() {
        let err = SyncError::RateLimited {
            service: "starrail".to_string(),
            retry_after: Some(Duration::from_secs(60)),
            message: "slow down".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::RateLimit);
        assert_eq!(err.retry_after(), Some(Duration::from_secs(60)));
        assert!(err.is_retryable());
    }

    #[test]
    fn api_error_uses_retcode_before_status() {
        assert_eq!(api_error(Some(-100), Some(200)).kind(), ErrorKind::Auth);
        assert_eq!(api_error(Some(10101), None).kind(), ErrorKind::RateLimit);
        assert_eq!(api_error(None, Some(429)).kind(), ErrorKind::RateLimit);
        assert_eq!(api_error(None, Some(401)).kind(), ErrorKind::Auth);
        assert_eq!(api_error(Some(-1), Some(500)).kind(), ErrorKind::Generic);
    }

    #[test]
    fn unrelated_errors_are_generic() {
        assert_eq!(SyncError::Timeout(10).kind(), ErrorKind::Generic);
        assert_eq!(
            SyncError::ParseResponse("bad".to_string()).kind(),
            ErrorKind::Generic
        );
    }

    #[test]
    fn exit_codes_are_correct() {
        assert_eq!(SyncError::Timeout(1).exit_code(), ExitCode::Timeout);
        assert_eq!(
            SyncError::InvalidDataType("x".to_string()).exit_code(),
            ExitCode::ParseError
        );
        assert_eq!(api_error(None, None).exit_code(), ExitCode::GeneralError);
    }
}
