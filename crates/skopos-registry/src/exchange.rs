//! Bearer-token exchange shared by the registries that issue per-scope tokens.
//!
//! The flow is the same everywhere: `GET <token endpoint>` with an optional
//! `Authorization: Basic …` header, read `{ "token": … }` (or `access_token`)
//! from the JSON response, and send it back as `Authorization: Bearer …`.

use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;

use crate::error::{RegistryError, Result};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

/// Fetches a bearer token from `url`.
///
/// `basic` is an already base64-encoded `user:password` credential.
pub(crate) async fn fetch_bearer_token(
    http: &reqwest::Client,
    provider: &str,
    url: &str,
    basic: Option<&str>,
) -> Result<String> {
    tracing::debug!(provider, url, authenticated = basic.is_some(), "Requesting bearer token");

    let mut request = http.get(url).header(ACCEPT, "application/json");
    if let Some(encoded) = basic {
        request = request.header(AUTHORIZATION, format!("Basic {encoded}"));
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(RegistryError::authentication(
            provider,
            format!(
                "token endpoint returned {status}: {}",
                response.text().await.unwrap_or_default()
            ),
        ));
    }

    let body: TokenResponse = response.json().await.map_err(|e| {
        RegistryError::authentication(provider, format!("unexpected token response: {e}"))
    })?;

    body.token
        .or(body.access_token)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| RegistryError::authentication(provider, "token response has no token"))
}

/// Builds the `repository:<name>:pull` scope used by token endpoints.
pub(crate) fn pull_scope(repository: &str) -> String {
    format!("repository:{repository}:pull")
}
