//! HTTP transport.
//!
//! Sends game-record requests to the HoYoLAB API and unwraps the
//! `{retcode, message, data}` envelope. Failures are mapped to [`SyncError`]
//! variants that [`SyncError::kind`] can classify.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Client, ClientBuilder, StatusCode, Url};
use serde::Deserialize;

use super::client_cache::{ApiRequest, Transport};
use super::models::{Payload, RATE_LIMIT_RETCODES};
use super::snapshot::Credentials;
use crate::error::{Result, SyncError};

/// Default timeout for HTTP requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Public HoYoLAB API base.
pub const DEFAULT_API_BASE: &str = "https://bbs-api-os.hoyolab.com";

/// Build a configured HTTP client.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn build_client(timeout: Duration) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert("x-rpc-client_type", HeaderValue::from_static("5"));
    headers.insert("x-rpc-language", HeaderValue::from_static("en-us"));

    ClientBuilder::new()
        .timeout(timeout)
        .default_headers(headers)
        .user_agent(format!("feedsync/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| SyncError::Network(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct Envelope {
    retcode: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<Payload>,
}

/// [`Transport`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn url(&self, request: &ApiRequest) -> Result<Url> {
        let raw = format!("{}{}", self.base_url, request.path);
        Url::parse_with_params(&raw, &request.query)
            .map_err(|e| SyncError::Config(format!("invalid API URL {raw}: {e}")))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, credentials: &Credentials, request: &ApiRequest) -> Result<Payload> {
        let service = request.service().id();
        let url = self.url(request)?;
        let cookie = HeaderValue::from_str(&credentials.cookie_header())
            .map_err(|e| SyncError::Config(format!("credentials are not a valid cookie: {e}")))?;

        tracing::debug!(service, path = request.path, "HTTP request");
        let response = self
            .client
            .get(url)
            .header(COOKIE, cookie)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SyncError::Timeout(self.timeout.as_secs())
                } else {
                    SyncError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(SyncError::RateLimited {
                service: service.to_string(),
                retry_after,
                message: format!("HTTP {status}"),
            });
        }
        if !status.is_success() {
            return Err(SyncError::ApiError {
                service: service.to_string(),
                code: None,
                status: Some(status.as_u16()),
                message: format!("HTTP {status}"),
            });
        }

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| SyncError::ParseResponse(e.to_string()))?;

        match envelope.retcode {
            0 => Ok(envelope.data.unwrap_or(Payload::Null)),
            code if RATE_LIMIT_RETCODES.contains(&code) => Err(SyncError::RateLimited {
                service: service.to_string(),
                retry_after: None,
                message: envelope.message,
            }),
            code => Err(SyncError::ApiError {
                service: service.to_string(),
                code: Some(code),
                status: Some(status.as_u16()),
                message: envelope.message,
            }),
        }
    }
}
