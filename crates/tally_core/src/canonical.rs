//! Request normalization and validation.

use crate::QueryRequest;
use serde::Serialize;
use tally_error::{JsonError, ValidationError};

/// A validated query stripped of credentials and empty optional fields.
///
/// Field order and names are fixed, so the JSON rendering is deterministic
/// and suitable for deriving cache keys. Optional fields that were present
/// but empty (`""` or `0`) are dropped, making explicit-empty and absent
/// indistinguishable.
///
/// # Examples
///
/// ```
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
///     .filters("")
///     .build()
///     .unwrap();
///
/// let canonical = CanonicalRequest::from_request(&request).unwrap();
/// assert!(canonical.filters().is_none());
/// assert_eq!(
///     canonical.to_json().unwrap(),
///     r#"{"ids":"ga:1","start-date":"2024-01-01","end-date":"2024-01-02","metrics":"ga:users"}"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, derive_getters::Getters)]
pub struct CanonicalRequest {
    #[serde(rename = "ids")]
    resource_id: String,
    #[serde(rename = "start-date")]
    start_date: String,
    #[serde(rename = "end-date")]
    end_date: String,
    metrics: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    filters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<String>,
    #[serde(rename = "max-results", skip_serializing_if = "Option::is_none")]
    max_results: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort: Option<String>,
}

impl CanonicalRequest {
    /// Validate a raw request and build its canonical form.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first missing required field,
    /// checked in the order resource id, start date, end date, metrics.
    #[tracing::instrument(skip(request), fields(resource_id = %request.resource_id))]
    pub fn from_request(request: &QueryRequest) -> Result<Self, ValidationError> {
        let required = [
            ("resource_id", &request.resource_id),
            ("start_date", &request.start_date),
            ("end_date", &request.end_date),
            ("metrics", &request.metrics),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.is_empty()) {
            tracing::debug!(field, "Rejecting request with missing field");
            return Err(ValidationError::missing(*field));
        }

        Ok(Self {
            resource_id: request.resource_id.clone(),
            start_date: request.start_date.clone(),
            end_date: request.end_date.clone(),
            metrics: request.metrics.clone(),
            filters: non_empty(&request.filters),
            dimensions: non_empty(&request.dimensions),
            max_results: request.max_results.filter(|n| *n > 0),
            sort: non_empty(&request.sort),
        })
    }

    /// Deterministic JSON rendering used for cache-key derivation.
    pub fn to_json(&self) -> Result<String, JsonError> {
        serde_json::to_string(self).map_err(|e| JsonError::new(e.to_string()))
    }

    /// Wire parameters in canonical order.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("ids", self.resource_id.clone()),
            ("start-date", self.start_date.clone()),
            ("end-date", self.end_date.clone()),
            ("metrics", self.metrics.clone()),
        ];
        if let Some(filters) = &self.filters {
            pairs.push(("filters", filters.clone()));
        }
        if let Some(dimensions) = &self.dimensions {
            pairs.push(("dimensions", dimensions.clone()));
        }
        if let Some(max_results) = self.max_results {
            pairs.push(("max-results", max_results.to_string()));
        }
        if let Some(sort) = &self.sort {
            pairs.push(("sort", sort.clone()));
        }
        pairs
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}
