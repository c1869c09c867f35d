//! Raw query requests as supplied by callers.

use crate::Credentials;
use serde::{Deserialize, Serialize};

/// A reporting query as supplied by the caller.
///
/// Required fields default to empty so that an incomplete request can still be
/// built; [`CanonicalRequest::from_request`](crate::CanonicalRequest::from_request)
/// is where absence is rejected.
///
/// # Examples
///
/// ```
/// use tally_core::{Credentials, QueryRequest};
///
/// let request = QueryRequest::builder()
///     .credentials(Credentials::OAuthClient {
///         client_id: "client-1".to_string(),
///         client_secret: None,
///         refresh_token: None,
///     })
///     .resource_id("ga:123456")
///     .start_date("2024-01-01")
///     .end_date("2024-01-31")
///     .metrics("ga:sessions")
///     .dimensions("ga:date")
///     .build()
///     .unwrap();
///
/// assert_eq!(request.resource_id, "ga:123456");
/// assert_eq!(request.dimensions.as_deref(), Some("ga:date"));
/// assert!(request.filters.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_builder::Builder)]
#[builder(setter(into))]
pub struct QueryRequest {
    /// Credential material; excluded from the query's identity
    pub credentials: Credentials,
    /// Resource (profile/view) identifier
    #[builder(default)]
    pub resource_id: String,
    /// First day of the reporting window
    #[builder(default)]
    pub start_date: String,
    /// Last day of the reporting window
    #[builder(default)]
    pub end_date: String,
    /// Comma-separated metric names
    #[builder(default)]
    pub metrics: String,
    /// Optional filter expression
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub filters: Option<String>,
    /// Optional comma-separated dimension names
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub dimensions: Option<String>,
    /// Optional row cap
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub max_results: Option<u32>,
    /// Optional sort expression
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub sort: Option<String>,
}

impl QueryRequest {
    /// Creates a new query request builder.
    pub fn builder() -> QueryRequestBuilder {
        QueryRequestBuilder::default()
    }
}
