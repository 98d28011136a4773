//! Field-level validation errors.
//!
//! Registry configurations are validated against a declared schema once per
//! configured entry. A failure names the offending field so the operator can
//! fix the corresponding configuration key.

use std::fmt;

/// A configuration value failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// A human-readable description of the validation failure.
    pub message: String,
    /// The kind of validation that failed.
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    /// Creates a new validation error.
    ///
    /// # Examples
    ///
    /// ```
    /// use skopos_core::{ValidationError, ValidationErrorKind};
    ///
    /// let error = ValidationError::new(
    ///     "authurl",
    ///     "\"authurl\" must be a valid uri",
    ///     ValidationErrorKind::Format,
    /// );
    /// assert_eq!(error.field, "authurl");
    /// ```
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        kind: ValidationErrorKind,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            kind,
        }
    }

    /// Creates a validation error for a required field that is missing.
    pub fn required(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("\"{field}\" is required"),
            field,
            kind: ValidationErrorKind::Required,
        }
    }

    /// Creates a validation error for a value of the wrong type.
    pub fn invalid_type(field: impl Into<String>, expected: &str) -> Self {
        let field = field.into();
        Self {
            message: format!("\"{field}\" must be a {expected}"),
            field,
            kind: ValidationErrorKind::Type,
        }
    }

    /// Creates a validation error for an invalid format.
    pub fn format(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            kind: ValidationErrorKind::Format,
        }
    }

    /// Creates a validation error for a key the schema does not declare.
    pub fn not_allowed(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("\"{field}\" is not allowed"),
            field,
            kind: ValidationErrorKind::NotAllowed,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation error for '{}': {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// The category of validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorKind {
    /// A required field was not provided.
    Required,
    /// The value has the wrong type.
    Type,
    /// The value format is invalid.
    Format,
    /// The field is not part of the schema.
    NotAllowed,
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "required"),
            Self::Type => write!(f, "type"),
            Self::Format => write!(f, "format"),
            Self::NotAllowed => write!(f, "not_allowed"),
        }
    }
}
