//! Time-bounded credential cache.
//!
//! Each provider instance whose backend issues expiring tokens owns exactly
//! one [`TokenCache`]. The cache holds at most one [`AuthToken`]; a token is
//! reused while `now < expires_at` and replaced, never mutated, once it
//! expires.

use std::fmt;
use std::future::Future;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::error::Result;

/// A fetched credential and the instant it stops being valid.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    /// Credential value as sent in the `Authorization` header.
    pub value: String,
    /// Expiry instant reported by the backend.
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    /// Creates a token.
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Returns true if the token is usable at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Single-slot cache of one provider's current token.
///
/// Callers hitting a cold or expired cache concurrently are serialized on the
/// slot lock, so only the first performs the fetch and the others reuse its
/// result.
#[derive(Debug, Default)]
pub struct TokenCache {
    slot: Mutex<Option<AuthToken>>,
}

impl TokenCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached token if it is still valid, fetching a new one otherwise.
    ///
    /// # Errors
    ///
    /// Propagates the error of `fetch`. The slot is left unchanged on failure.
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<AuthToken>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AuthToken>>,
    {
        let mut slot = self.slot.lock().await;

        if let Some(token) = slot.as_ref().filter(|t| t.is_valid_at(Utc::now())) {
            tracing::debug!(expires_at = %token.expires_at, "Token cache hit");
            return Ok(token.clone());
        }

        tracing::debug!(expired = slot.is_some(), "Token cache miss, fetching");
        let token = fetch().await?;
        *slot = Some(token.clone());
        Ok(token)
    }

    #[cfg(test)]
    pub(crate) async fn peek(&self) -> Option<AuthToken> {
        self.slot.lock().await.clone()
    }

    #[cfg(test)]
    pub(crate) async fn store(&self, token: AuthToken) {
        *self.slot.lock().await = Some(token);
    }
}
