//! Top-level error wrapper types.

use crate::{ConfigError, JsonError, ProviderError, StorageError, ValidationError};

/// Union of every error a tally operation can produce.
///
/// # Examples
///
/// ```
/// use tally_error::{TallyError, TallyErrorKind, ValidationError};
///
/// let err: TallyError = ValidationError::missing("metrics").into();
/// assert!(matches!(err.kind(), TallyErrorKind::Validation(_)));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum TallyErrorKind {
    /// Request rejected before dispatch
    #[from(ValidationError)]
    Validation(ValidationError),
    /// Error reported by the remote provider
    #[from(ProviderError)]
    Provider(ProviderError),
    /// Cache or session storage error
    #[from(StorageError)]
    Storage(StorageError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
}

/// Tally error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Tally Error: {}", _0)]
pub struct TallyError(Box<TallyErrorKind>);

impl TallyError {
    /// Create a new error from a kind.
    pub fn new(kind: TallyErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &TallyErrorKind {
        &self.0
    }

    /// The provider error behind this failure, if any.
    pub fn as_provider(&self) -> Option<&ProviderError> {
        match self.kind() {
            TallyErrorKind::Provider(e) => Some(e),
            _ => None,
        }
    }
}

impl<T> From<T> for TallyError
where
    T: Into<TallyErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for tally operations.
pub type TallyResult<T> = std::result::Result<T, TallyError>;
