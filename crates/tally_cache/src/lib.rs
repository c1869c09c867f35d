//! Content-addressed response caching with TTL.
//!
//! Responses are stored under a [`CacheKey`] derived from the SHA-256 digest
//! of a [`CanonicalRequest`](tally_core::CanonicalRequest). Staleness is
//! decided at read time; entries are overwritten on the next successful fetch
//! and never deleted.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod cache;
mod filesystem;
mod key;
mod memory;

pub use backend::{CacheBackend, CacheEntry};
pub use cache::ResponseCache;
pub use filesystem::{FileCache, write_atomically};
pub use key::CacheKey;
pub use memory::MemoryCache;
