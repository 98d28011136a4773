//! Error types for Skopos core operations.
//!
//! This module defines the error types used throughout the `skopos-core` crate.

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Skopos core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An image reference could not be parsed.
    #[error("Invalid image reference '{reference}': {reason}")]
    InvalidImageReference {
        /// The reference as given.
        reference: String,
        /// Reason the reference was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_reference() {
        let err = Error::InvalidImageReference {
            reference: "ghcr.io/".to_string(),
            reason: "empty repository name".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid image reference 'ghcr.io/': empty repository name"
        );
    }
}
