//! Error types for the tally reporting client.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use tally_error::{TallyResult, ValidationError};
//!
//! fn require_metrics(metrics: &str) -> TallyResult<()> {
//!     if metrics.is_empty() {
//!         Err(ValidationError::missing("metrics"))?
//!     }
//!     Ok(())
//! }
//!
//! assert!(require_metrics("").is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod json;
mod provider;
mod storage;
mod validation;

pub use config::ConfigError;
pub use error::{TallyError, TallyErrorKind, TallyResult};
pub use json::JsonError;
pub use provider::{ProviderError, ProviderErrorKind, RetryableError};
pub use storage::{StorageError, StorageErrorKind};
pub use validation::ValidationError;
