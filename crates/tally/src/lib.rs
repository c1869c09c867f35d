//! Tally - rate-limited, retrying, cache-assisted reporting queries
//!
//! Tally sits between callers issuing many reporting queries and a remote
//! metrics API with a concurrency quota. Every query goes through the same
//! pipeline:
//!
//! 1. **Validate** the request and build its canonical form
//! 2. **Cache lookup** by the SHA-256 of the canonical form, honouring a TTL
//! 3. **Authorize** by reusing a valid session or performing a handshake
//! 4. **Admit** into a bounded FIFO pool of outstanding calls
//! 5. **Call** the provider, retrying rate-limit rejections after a fixed delay
//! 6. **Write through** successful responses to the cache
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tally::{Client, ClientSettings, Credentials, QueryRequest, TallyConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TallyConfig::load()?;
//!     let client = Client::from_config(&config)?;
//!
//!     let request = QueryRequest::builder()
//!         .credentials(Credentials::OAuthClient {
//!             client_id: "my-client".into(),
//!             client_secret: Some("secret".into()),
//!             refresh_token: Some("1//refresh".into()),
//!         })
//!         .resource_id("ga:123456")
//!         .start_date("2024-01-01")
//!         .end_date("2024-01-31")
//!         .metrics("ga:sessions")
//!         .build()?;
//!
//!     let report = client.query(&request).await?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `tally_error` - Error types
//! - `tally_core` - Requests, credentials, sessions, settings
//! - `tally_interface` - `ReportingApi` and `Authorizer` traits
//! - `tally_rate_limit` - Admission control and retry policy
//! - `tally_cache` - Content-addressed response cache
//! - `tally_session` - Session persistence and reuse
//! - `tally_provider` - HTTP provider
//!
//! This crate ties them together and re-exports the public surface.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cli;
mod client;
mod config;
mod phase;
mod telemetry;

pub use cli::{Cli, Commands, QueryArgs, run};
pub use client::{Client, ClientBuilder};
pub use config::{EndpointConfig, TallyConfig};
pub use phase::QueryPhase;
pub use telemetry::init_tracing;

pub use tally_cache::{CacheBackend, CacheEntry, CacheKey, FileCache, MemoryCache, ResponseCache};
pub use tally_core::*;
pub use tally_error::*;
pub use tally_interface::{Authorizer, ReportingApi};
pub use tally_provider::{HttpAuthorizer, HttpReportingApi};
pub use tally_rate_limit::{AdmissionController, AdmissionGuard, Reservation, RetryPolicy};
pub use tally_session::{
    CredentialManager, FileSessionStore, MemorySessionStore, SessionStore, session_file_name,
};
