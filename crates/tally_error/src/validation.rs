//! Request validation errors.

/// A query was rejected before any network call was made.
///
/// # Examples
///
/// ```
/// use tally_error::ValidationError;
///
/// let err = ValidationError::missing("start_date");
/// assert_eq!(err.field, "start_date");
/// assert!(format!("{}", err).contains("Missing argument for start_date"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("Validation Error: Missing argument for {} at line {} in {}", field, line, file)]
pub struct ValidationError {
    /// Name of the missing required field
    pub field: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ValidationError {
    /// Create an error for a required field that is absent or empty.
    #[track_caller]
    pub fn missing(field: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            field: field.into(),
            line: location.line(),
            file: location.file(),
        }
    }
}
