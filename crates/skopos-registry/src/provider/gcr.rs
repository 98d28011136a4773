//! Google Container Registry.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use skopos_core::ContainerImage;

use super::{host_in_domain, untyped, ProviderKind, RegistryProvider};
use crate::error::Result;
use crate::exchange::{fetch_bearer_token, pull_scope};
use crate::request::{basic_encode, PullCredentials, RequestOptions};
use crate::schema::{Configuration, FieldSpec, Schema};

const GCR_DOMAIN: &str = "gcr.io";
const GCR_TOKEN_URL: &str = "https://gcr.io/v2/token";
const JSON_KEY_USER: &str = "_json_key";

/// Service-account configuration. Empty for anonymous pulls.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct GcrConfiguration {
    /// Service account email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clientemail: Option<String>,
    /// Service account private key (PEM).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privatekey: Option<String>,
}

/// Google Container Registry provider.
#[derive(Clone)]
pub struct Gcr {
    name: String,
    config: GcrConfiguration,
    http: reqwest::Client,
    token_url: String,
}

impl Gcr {
    /// Creates a provider from a validated configuration.
    pub fn new(name: impl Into<String>, config: GcrConfiguration, http: reqwest::Client) -> Self {
        Self {
            name: name.into(),
            config,
            http,
            token_url: GCR_TOKEN_URL.to_string(),
        }
    }

    /// Overrides the token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Configuration schema.
    #[must_use]
    pub fn schema() -> Schema {
        Schema::new()
            .allow_empty()
            .field(FieldSpec::string("clientemail").required())
            .field(FieldSpec::string("privatekey").required().secret())
    }

    /// `_json_key` credential: the service account serialized as JSON.
    fn json_key(&self) -> Option<String> {
        let (Some(email), Some(key)) = (&self.config.clientemail, &self.config.privatekey) else {
            return None;
        };
        let account = serde_json::json!({
            "client_email": email,
            "private_key": key,
        });
        Some(basic_encode(JSON_KEY_USER, &account.to_string()))
    }
}

impl fmt::Debug for Gcr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gcr")
            .field("name", &self.name)
            .field("clientemail", &self.config.clientemail)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RegistryProvider for Gcr {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gcr
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn configuration(&self) -> Configuration {
        untyped(&self.config)
    }

    fn matches(&self, image: &ContainerImage) -> bool {
        host_in_domain(image.host(), GCR_DOMAIN)
    }

    async fn authenticate(
        &self,
        image: &ContainerImage,
        mut options: RequestOptions,
    ) -> Result<RequestOptions> {
        let Some(json_key) = self.json_key() else {
            return Ok(options);
        };

        let url = format!("{}?scope={}", self.token_url, pull_scope(&image.name));
        let token = fetch_bearer_token(&self.http, &self.id(), &url, Some(&json_key)).await?;
        options.set_bearer(&token)?;
        Ok(options)
    }

    fn auth_pull(&self) -> Option<PullCredentials> {
        match (&self.config.clientemail, &self.config.privatekey) {
            (Some(email), Some(key)) => Some(PullCredentials::new(email, key)),
            _ => None,
        }
    }
}
