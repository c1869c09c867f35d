//! Reusable session credentials.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A time-bounded access/refresh token pair.
///
/// Serialized as `{"access_token", "refresh_token", "expiry_date", ...}` with
/// `expiry_date` in epoch milliseconds. Fields the provider returns beyond
/// these are kept in `extra` and written back unchanged.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use tally_core::SessionCredential;
///
/// let now = Utc::now();
/// let session = SessionCredential::new("token", None, now + Duration::minutes(5));
/// assert!(session.is_valid_at(now));
/// assert!(!session.is_valid_at(now + Duration::minutes(5)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct SessionCredential {
    access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    expiry_date: DateTime<Utc>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl SessionCredential {
    /// Create a session with no extra provider fields.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expiry_date: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expiry_date,
            extra: Map::new(),
        }
    }

    /// Attach provider fields to be persisted alongside the token pair.
    pub fn with_extra(mut self, extra: Map<String, Value>) -> Self {
        self.extra = extra;
        self
    }

    /// Whether the session may still be used at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date > now
    }

    /// Whether the session may still be used.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}
