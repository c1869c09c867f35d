//! Core data types for the tally reporting client.
//!
//! This crate provides the request, credential and settings types shared by
//! every other tally crate, plus the normalizer that turns a raw
//! [`QueryRequest`] into the [`CanonicalRequest`] used for cache keys and
//! dispatch.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod canonical;
mod credentials;
mod request;
mod session;
mod settings;

pub use canonical::CanonicalRequest;
pub use credentials::Credentials;
pub use request::{QueryRequest, QueryRequestBuilder, QueryRequestBuilderError};
pub use session::SessionCredential;
pub use settings::{ClientSettings, ClientSettingsBuilder, ClientSettingsBuilderError};
