//! Error types for `schoolfix-lib`.

use thiserror::Error;

/// Primary error type for store and lifecycle operations.
#[derive(Error, Debug)]
pub enum StoreError {
    // === Issue Errors ===
    /// Issue with the specified ID was not found.
    #[error("Issue not found: {id}")]
    IssueNotFound { id: String },

    // === Validation Errors ===
    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Multiple validation errors occurred.
    #[error("Validation errors: {}", join_errors(.errors))]
    ValidationErrors { errors: Vec<ValidationError> },

    /// Invalid status value.
    #[error("Invalid status: {status}")]
    InvalidStatus { status: String },

    /// Invalid priority value.
    #[error("Invalid priority: {priority}")]
    InvalidPriority { priority: String },

    /// Invalid category value.
    #[error("Invalid category: {category}")]
    InvalidCategory { category: String },

    // === Storage Errors ===
    /// The backing collection exists but could not be read or decoded.
    ///
    /// Distinct from an empty collection: callers must not treat this as "no issues".
    #[error("Store unreadable ({source_name}): {reason}")]
    Unreadable { source_name: String, reason: String },

    /// Remote or backend-specific failure.
    #[error("Backend error: {0}")]
    Backend(String),

    // === Configuration Errors ===
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single field validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl StoreError {
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn unreadable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unreadable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn from_validation_errors(errors: Vec<ValidationError>) -> Self {
        if errors.len() == 1 {
            let err = &errors[0];
            Self::Validation {
                field: err.field.clone(),
                reason: err.message.clone(),
            }
        } else {
            Self::ValidationErrors { errors }
        }
    }

    /// True for errors caused by the caller's input rather than the store.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::ValidationErrors { .. }
                | Self::InvalidStatus { .. }
                | Self::InvalidPriority { .. }
                | Self::InvalidCategory { .. }
        )
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::IssueNotFound { .. })
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Result type using `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_validation_error_collapses() {
        let err = StoreError::from_validation_errors(vec![ValidationError::new(
            "title",
            "cannot be empty",
        )]);
        assert!(matches!(err, StoreError::Validation { ref field, .. } if field == "title"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_multiple_validation_errors_are_listed() {
        let err = StoreError::from_validation_errors(vec![
            ValidationError::new("title", "cannot be empty"),
            ValidationError::new("description", "cannot be empty"),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation errors: title: cannot be empty; description: cannot be empty"
        );
    }

    #[test]
    fn test_unreadable_is_not_a_client_error() {
        let err = StoreError::unreadable("data/issues.json", "expected value at line 1");
        assert!(!err.is_client_error());
        assert!(!err.is_not_found());
    }
}
