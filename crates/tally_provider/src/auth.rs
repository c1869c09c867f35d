//! OAuth token exchange over HTTP.

use crate::reporting::error_message;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tally_core::{Credentials, SessionCredential};
use tally_error::{ProviderError, ProviderErrorKind};
use tally_interface::Authorizer;
use tracing::{debug, instrument};

/// Read-only reporting scope requested for service accounts.
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/analytics.readonly";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Authorizer exchanging credentials at an OAuth2 token endpoint.
///
/// - Service accounts use the JWT bearer grant: an RS256 assertion signed
///   with the account's private key.
/// - OAuth clients use the `refresh_token` grant.
#[derive(Debug, Clone)]
pub struct HttpAuthorizer {
    client: reqwest::Client,
    token_url: String,
    scope: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

impl HttpAuthorizer {
    /// Create an authorizer for the token endpoint at `token_url`.
    pub fn new(token_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), token_url)
    }

    /// Create an authorizer sharing an existing HTTP client.
    pub fn with_client(client: reqwest::Client, token_url: impl Into<String>) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            scope: DEFAULT_SCOPE.to_string(),
        }
    }

    /// Request `scope` for service accounts instead of [`DEFAULT_SCOPE`].
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Scope requested for service accounts.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    #[instrument(skip_all)]
    async fn exchange(
        &self,
        form: &[(&str, &str)],
        kept_refresh_token: Option<&str>,
    ) -> Result<SessionCredential, ProviderError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::Transport(e.to_string())))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::Transport(e.to_string())))?;
        debug!(status = status.as_u16(), "Token endpoint responded");

        if status.as_u16() == 429 {
            return Err(ProviderError::new(ProviderErrorKind::RateLimited {
                status_code: 429,
                message: error_message(&body),
            }));
        }
        if !status.is_success() {
            return Err(ProviderError::new(ProviderErrorKind::Authorization(format!(
                "HTTP {}: {}",
                status.as_u16(),
                error_message(&body)
            ))));
        }

        session_from_token_response(&body, Utc::now(), kept_refresh_token)
    }
}

#[async_trait]
impl Authorizer for HttpAuthorizer {
    #[instrument(skip(self, credentials), fields(identity = credentials.identity()))]
    async fn authorize(&self, credentials: &Credentials) -> Result<SessionCredential, ProviderError> {
        match credentials {
            Credentials::ServiceAccount { email, key } => {
                let assertion = sign_assertion(email, key, &self.scope, &self.token_url, Utc::now())?;
                let form = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];
                self.exchange(&form, None).await
            }
            Credentials::OAuthClient {
                client_id,
                client_secret,
                refresh_token: Some(refresh_token),
            } => {
                let mut form = vec![
                    ("grant_type", "refresh_token"),
                    ("client_id", client_id.as_str()),
                    ("refresh_token", refresh_token.as_str()),
                ];
                if let Some(secret) = client_secret {
                    form.push(("client_secret", secret.as_str()));
                }
                self.exchange(&form, Some(refresh_token.as_str())).await
            }
            Credentials::OAuthClient { .. } => Err(ProviderError::new(
                ProviderErrorKind::Authorization("OAuth client has no refresh token".to_string()),
            )),
        }
    }
}

/// Sign a JWT bearer assertion for `email`, valid for one hour from `now`.
fn sign_assertion(
    email: &str,
    key_pem: &str,
    scope: &str,
    audience: &str,
    now: DateTime<Utc>,
) -> Result<String, ProviderError> {
    let key = EncodingKey::from_rsa_pem(key_pem.as_bytes()).map_err(|e| {
        ProviderError::new(ProviderErrorKind::Authorization(format!(
            "Invalid service account key: {}",
            e
        )))
    })?;

    let claims = AssertionClaims {
        iss: email.to_string(),
        scope: scope.to_string(),
        aud: audience.to_string(),
        iat: now.timestamp(),
        exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
    };

    encode(&Header::new(Algorithm::RS256), &claims, &key).map_err(|e| {
        ProviderError::new(ProviderErrorKind::Authorization(format!(
            "Failed to sign assertion: {}",
            e
        )))
    })
}

/// Build a session from a token endpoint body received at `now`.
///
/// Token endpoints usually omit the refresh token on refresh; the one used
/// for the exchange is kept in that case.
fn session_from_token_response(
    body: &str,
    now: DateTime<Utc>,
    kept_refresh_token: Option<&str>,
) -> Result<SessionCredential, ProviderError> {
    let token: TokenResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::new(ProviderErrorKind::InvalidResponse(e.to_string())))?;

    let expires_in = token.expires_in.unwrap_or(3600);
    let refresh_token = token
        .refresh_token
        .or_else(|| kept_refresh_token.map(str::to_string));

    Ok(
        SessionCredential::new(token.access_token, refresh_token, now + Duration::seconds(expires_in))
            .with_extra(token.extra),
    )
}
