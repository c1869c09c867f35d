//! Session credential persistence and reuse.
//!
//! [`CredentialManager`] hands out a valid [`SessionCredential`](tally_core::SessionCredential)
//! for a set of credentials, reusing a remembered or persisted session while
//! its expiry lies in the future and performing the authorization handshake
//! otherwise.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod manager;
mod store;

pub use manager::CredentialManager;
pub use store::{FileSessionStore, MemorySessionStore, SessionStore, session_file_name};
