use std::fmt;

use thiserror::Error;

/// Caller-facing classification of a failure.
///
/// Every [`CoreError`] maps onto exactly one kind, no matter how many times it
/// has been wrapped with operation context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request can be corrected by the client.
    InvalidInput,
    /// The addressed resource does not exist.
    NotFound,
    /// Storage or infrastructure failure.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("{context}: {source}")]
    Wrapped {
        context: String,
        #[source]
        source: Box<CoreError>,
    },
}

impl CoreError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        CoreError::InvalidInput(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        CoreError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CoreError::Internal(message.into())
    }

    /// Returns the kind of the innermost error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidInput(_) => ErrorKind::InvalidInput,
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::Internal(_) | CoreError::Database(_) | CoreError::Serialization(_) => {
                ErrorKind::Internal
            }
            CoreError::Wrapped { source, .. } => source.kind(),
        }
    }

    /// Prefixes the error with operation context. The kind is preserved.
    pub fn wrap(self, context: impl Into<String>) -> Self {
        CoreError::Wrapped {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        self.kind() == ErrorKind::InvalidInput
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Adds operation context to the error side of a [`Result`].
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|err| err.wrap(context))
    }
}

// Implement From for common error types
#[cfg(feature = "database")]
impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        CoreError::InvalidInput(format!("Validation failed: {}", errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_preserves_kind() {
        let err = CoreError::not_found("experiment 42").wrap("Get experiment failed");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Get experiment failed: Not found: experiment 42");
    }

    #[test]
    fn test_nested_wrap_preserves_kind() {
        let err = CoreError::invalid_input("bad sort")
            .wrap("Validate request failed")
            .wrap("List experiments failed");
        assert!(err.is_invalid_input());
        assert!(err.to_string().starts_with("List experiments failed: Validate request failed:"));
    }

    #[test]
    fn test_storage_errors_are_internal() {
        assert_eq!(CoreError::Database("down".into()).kind(), ErrorKind::Internal);
        assert_eq!(CoreError::Serialization("bad".into()).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(CoreError::internal("boom"));
        let err = result.context("Create experiment failed").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.to_string(), "Create experiment failed: Internal error: boom");
    }
}
