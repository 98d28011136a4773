//! Error types for registry operations.

use std::path::PathBuf;

use skopos_core::ValidationError;
use thiserror::Error;

/// Result type alias using [`RegistryError`] as the error type.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A registry configuration entry failed schema validation.
    #[error("Invalid configuration for registry {provider}: {source}")]
    Configuration {
        /// Provider id (`<kind>.<name>`).
        provider: String,
        /// Field-level validation failure.
        #[source]
        source: ValidationError,
    },

    /// A configuration entry names a registry kind that does not exist.
    #[error("Unknown registry provider '{kind}'")]
    UnknownProvider {
        /// Kind as written in the configuration.
        kind: String,
    },

    /// Token fetch or exchange failed, or returned an unexpected shape.
    #[error("Authentication failed for registry {provider}: {message}")]
    AuthenticationFailed {
        /// Provider id (`<kind>.<name>`).
        provider: String,
        /// Error message.
        message: String,
    },

    /// Failed to connect to a token endpoint.
    #[error("Failed to connect to {url}: {source}")]
    ConnectionFailed {
        /// Endpoint URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// HTTP error from a token endpoint.
    #[error("HTTP error from registry: {status} - {message}")]
    HttpError {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// A credential could not be encoded as an HTTP header.
    #[error("Invalid header value for {name}")]
    InvalidHeader {
        /// Header name.
        name: String,
    },

    /// Settings file could not be read.
    #[error("Failed to read configuration file {path}: {source}")]
    ConfigFile {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid JSON or has the wrong shape.
    #[error("Failed to parse configuration file {path}: {message}")]
    ConfigParse {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// A `__FILE` secret reference could not be read.
    #[error("Failed to read secret file {path} referenced by {variable}: {source}")]
    SecretFile {
        /// Environment variable holding the path.
        variable: String,
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {source}")]
    JsonError {
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

impl RegistryError {
    /// Creates an authentication error for the given provider.
    pub fn authentication(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Returns true for schema validation failures.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::ConnectionFailed {
                url: err
                    .url()
                    .map_or_else(|| "unknown".to_string(), ToString::to_string),
                source: err,
            }
        } else if err.is_status() {
            let status = err.status().map_or(0, |s| s.as_u16());
            Self::HttpError {
                status,
                message: err.to_string(),
            }
        } else {
            Self::HttpError {
                status: 0,
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError { source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_configuration_names_field() {
        let err = RegistryError::Configuration {
            provider: "gcr.private".to_string(),
            source: ValidationError::required("clientemail"),
        };
        let display = err.to_string();
        assert!(display.contains("gcr.private"));
        assert!(display.contains("\"clientemail\" is required"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_error_display_auth_failed() {
        let err = RegistryError::authentication("gitlab.private", "invalid token");
        assert_eq!(
            err.to_string(),
            "Authentication failed for registry gitlab.private: invalid token"
        );
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_error_display_unknown_provider() {
        let err = RegistryError::UnknownProvider {
            kind: "artifactory".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown registry provider 'artifactory'");
    }
}
