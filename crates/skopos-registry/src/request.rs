//! Request decoration and pull credentials.
//!
//! Providers never issue manifest or tag requests themselves. They decorate
//! the caller's [`RequestOptions`] with whatever the backend expects and hand
//! them back; the caller turns them into a real request with
//! [`RequestOptions::apply`].

use std::fmt;

use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::error::{RegistryError, Result};

/// Outgoing HTTP request options being decorated by a provider.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Request headers.
    pub headers: HeaderMap,
    /// Basic-auth tuple applied by the HTTP client, if any.
    pub basic_auth: Option<PullCredentials>,
}

impl RequestOptions {
    /// Creates empty request options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `Authorization: Basic <encoded>` from an already base64-encoded value.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidHeader`] if the value is not a valid header.
    pub fn set_basic(&mut self, encoded: &str) -> Result<()> {
        self.set_authorization("Basic", encoded)
    }

    /// Sets `Authorization: Bearer <token>`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidHeader`] if the token is not a valid header.
    pub fn set_bearer(&mut self, token: &str) -> Result<()> {
        self.set_authorization("Bearer", token)
    }

    fn set_authorization(&mut self, scheme: &str, credential: &str) -> Result<()> {
        let mut value = HeaderValue::from_str(&format!("{scheme} {credential}")).map_err(|_| {
            RegistryError::InvalidHeader {
                name: AUTHORIZATION.to_string(),
            }
        })?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(())
    }

    /// Returns the `Authorization` header value, if set and printable.
    #[must_use]
    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
    }

    /// Applies headers and basic auth to a request builder.
    #[must_use]
    pub fn apply(self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.headers(self.headers);
        match self.basic_auth {
            Some(credentials) => {
                builder.basic_auth(credentials.username, Some(credentials.password))
            }
            None => builder,
        }
    }
}

/// Static username/password pair for Docker-style basic-auth pulls.
#[derive(Clone, PartialEq, Eq)]
pub struct PullCredentials {
    /// Username (may be empty for token-only registries).
    pub username: String,
    /// Password or token.
    pub password: String,
}

impl PullCredentials {
    /// Creates a credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns `base64(username:password)`.
    #[must_use]
    pub fn encode(&self) -> String {
        basic_encode(&self.username, &self.password)
    }
}

impl fmt::Debug for PullCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PullCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Encodes a basic-auth credential as `base64(user:password)`.
#[must_use]
pub fn basic_encode(username: &str, password: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_bearer() {
        let mut options = RequestOptions::new();
        options.set_bearer("xxxxx").unwrap();
        assert_eq!(options.authorization(), Some("Bearer xxxxx"));
        assert!(options.headers.get(AUTHORIZATION).unwrap().is_sensitive());
    }

    #[test]
    fn test_set_basic_replaces_previous_authorization() {
        let mut options = RequestOptions::new();
        options.set_bearer("old").unwrap();
        options.set_basic("dXNlcjpwYXNz").unwrap();
        assert_eq!(options.authorization(), Some("Basic dXNlcjpwYXNz"));
        assert_eq!(options.headers.len(), 1);
    }

    #[test]
    fn test_invalid_header_value() {
        let mut options = RequestOptions::new();
        let err = options.set_bearer("line\nbreak").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidHeader { .. }));
    }

    #[test]
    fn test_basic_encode() {
        assert_eq!(basic_encode("user", "pass"), "dXNlcjpwYXNz");
        assert_eq!(basic_encode("", "token"), "OnRva2Vu");
    }

    #[test]
    fn test_pull_credentials_debug_redacts_password() {
        let credentials = PullCredentials::new("AKIA", "secretaccesskey");
        let debug = format!("{credentials:?}");
        assert!(debug.contains("AKIA"));
        assert!(!debug.contains("secretaccesskey"));
        assert_eq!(credentials.encode(), basic_encode("AKIA", "secretaccesskey"));
    }
}
