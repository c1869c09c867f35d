//! Trait definitions for the network seams of the tally client.
//!
//! The wire protocol of the reporting provider and the cryptography of its
//! authorization handshake live behind these traits. The client only relies on
//! the error classification carried by [`ProviderError`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod traits;

pub use traits::{Authorizer, ReportingApi};

/// Re-exported so implementors need only this crate.
pub use tally_error::{ProviderError, ProviderErrorKind};
