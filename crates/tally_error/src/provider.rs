//! Errors reported by the remote reporting provider and retry classification.

/// Provider-side error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ProviderErrorKind {
    /// The provider rejected the call because a quota was exhausted
    #[display("Rate limited (HTTP {}): {}", status_code, message)]
    RateLimited {
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },
    /// Any other non-success HTTP response
    #[display("HTTP {} error: {}", status_code, message)]
    Http {
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },
    /// The request never produced a response
    #[display("Transport failure: {}", _0)]
    Transport(String),
    /// The authorization handshake failed
    #[display("Authorization failed: {}", _0)]
    Authorization(String),
    /// The response body could not be interpreted
    #[display("Invalid response: {}", _0)]
    InvalidResponse(String),
}

impl ProviderErrorKind {
    /// Only rate-limit rejections are worth resubmitting.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderErrorKind::RateLimited { .. })
    }
}

/// Provider error with source location tracking.
///
/// # Examples
///
/// ```
/// use tally_error::{ProviderError, ProviderErrorKind, RetryableError};
///
/// let err = ProviderError::new(ProviderErrorKind::RateLimited {
///     status_code: 403,
///     message: "userRateLimitExceeded".to_string(),
/// });
/// assert!(err.is_retryable());
///
/// let err = ProviderError::new(ProviderErrorKind::Http {
///     status_code: 400,
///     message: "invalid metric".to_string(),
/// });
/// assert!(!err.is_retryable());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Provider Error: {} at line {} in {}", kind, line, file)]
pub struct ProviderError {
    /// The kind of error that occurred
    pub kind: ProviderErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ProviderError {
    /// Create a new ProviderError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ProviderErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Trait for errors that support retry logic.
///
/// Implementors decide whether a failed attempt should be resubmitted.
/// Errors that return `false` are surfaced to the caller after one attempt.
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    fn is_retryable(&self) -> bool;
}

impl RetryableError for ProviderError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}
