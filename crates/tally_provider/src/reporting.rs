//! Data queries over HTTP.

use async_trait::async_trait;
use serde_json::Value;
use tally_core::{CanonicalRequest, SessionCredential};
use tally_error::{ProviderError, ProviderErrorKind};
use tally_interface::ReportingApi;
use tracing::{debug, instrument};

/// Reporting API reached with `GET {base_url}?ids=..&start-date=..`.
#[derive(Debug, Clone)]
pub struct HttpReportingApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpReportingApi {
    /// Create a provider for the endpoint at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a provider sharing an existing HTTP client.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Endpoint queried by this provider.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ReportingApi for HttpReportingApi {
    #[instrument(skip(self, request, session), fields(ids = %request.resource_id()))]
    async fn fetch(
        &self,
        request: &CanonicalRequest,
        session: &SessionCredential,
    ) -> Result<Value, ProviderError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&request.query_pairs())
            .bearer_auth(session.access_token())
            .send()
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::Transport(e.to_string())))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::Transport(e.to_string())))?;
        debug!(status = status.as_u16(), size = body.len(), "Received response");

        if !status.is_success() {
            return Err(classify_status(status.as_u16(), error_message(&body)));
        }

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::new(ProviderErrorKind::InvalidResponse(e.to_string())))
    }

    fn provider_name(&self) -> &'static str {
        "http"
    }
}

/// Map a non-success status to a provider error.
///
/// 403 and 429 are how the reporting API signals exhausted quota, so both
/// are classified as rate limiting.
///
/// ```
/// use tally_error::{ProviderErrorKind, RetryableError};
/// use tally_provider::classify_status;
///
/// assert!(classify_status(403, "userRateLimitExceeded".into()).is_retryable());
/// assert!(classify_status(429, "slow down".into()).is_retryable());
/// assert!(matches!(
///     classify_status(400, "bad metric".into()).kind,
///     ProviderErrorKind::Http { status_code: 400, .. }
/// ));
/// ```
pub fn classify_status(status_code: u16, message: String) -> ProviderError {
    match status_code {
        403 | 429 => ProviderError::new(ProviderErrorKind::RateLimited {
            status_code,
            message,
        }),
        _ => ProviderError::new(ProviderErrorKind::Http {
            status_code,
            message,
        }),
    }
}

/// Extract `error.message` from a JSON error body, falling back to the raw body.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("error_description"))
                .or_else(|| v.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
