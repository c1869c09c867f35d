//! HTTP implementations of the tally provider traits.
//!
//! [`HttpReportingApi`] talks to a core-reporting style `GET` endpoint and
//! [`HttpAuthorizer`] obtains access tokens with a signed service-account
//! assertion or an OAuth refresh token.
//! Both classify failures into [`ProviderErrorKind`](tally_error::ProviderErrorKind)
//! so the client knows which ones to retry.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod reporting;

pub use auth::{DEFAULT_SCOPE, HttpAuthorizer};
pub use reporting::{HttpReportingApi, classify_status};
