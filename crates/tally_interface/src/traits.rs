//! Traits implemented by reporting providers.

use async_trait::async_trait;
use serde_json::Value;
use tally_core::{CanonicalRequest, Credentials, SessionCredential};
use tally_error::ProviderError;

/// A remote metrics-reporting API.
///
/// Each call to [`fetch`](ReportingApi::fetch) is exactly one network
/// attempt. Rate-limit rejections must be reported as
/// [`ProviderErrorKind::RateLimited`](tally_error::ProviderErrorKind::RateLimited)
/// so the client can retry them.
#[async_trait]
pub trait ReportingApi: Send + Sync {
    /// Execute a canonical query with an authorized session.
    async fn fetch(
        &self,
        request: &CanonicalRequest,
        session: &SessionCredential,
    ) -> Result<Value, ProviderError>;

    /// Provider name used in logs.
    fn provider_name(&self) -> &'static str;
}

/// Performs the authorization handshake for a set of credentials.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Obtain a fresh session from the provider.
    async fn authorize(&self, credentials: &Credentials) -> Result<SessionCredential, ProviderError>;
}
