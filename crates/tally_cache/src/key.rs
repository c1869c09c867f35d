//! Cache key derivation.

use sha2::{Digest, Sha256};
use tally_core::CanonicalRequest;
use tally_error::JsonError;

/// Filesystem-safe identity of a canonical request.
///
/// The key is the lowercase hex SHA-256 digest of the request's canonical
/// JSON, so it contains only `[0-9a-f]` and is usable directly as a file name.
///
/// # Examples
///
/// ```
/// use tally_cache::CacheKey;
/// use tally_core::{CanonicalRequest, Credentials, QueryRequest};
///
/// let request = QueryRequest::builder()
///     .credentials(Credentials::OAuthClient {
///         client_id: "c".to_string(),
///         client_secret: None,
///         refresh_token: None,
///     })
///     .resource_id("ga:1")
///     .start_date("2024-01-01")
///     .end_date("2024-01-02")
///     .metrics("ga:users")
///     .build()
///     .unwrap();
/// let key = CacheKey::derive(&CanonicalRequest::from_request(&request).unwrap()).unwrap();
///
/// assert_eq!(key.as_str().len(), 64);
/// assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("{}", _0)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a canonical request.
    pub fn derive(request: &CanonicalRequest) -> Result<Self, JsonError> {
        let json = request.to_json()?;
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Ok(Self(format!("{:x}", hasher.finalize())))
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
