//! Quay.io.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use skopos_core::ContainerImage;

use super::{host_in_domain, untyped, ProviderKind, RegistryProvider};
use crate::error::Result;
use crate::exchange::{fetch_bearer_token, pull_scope};
use crate::request::{basic_encode, PullCredentials, RequestOptions};
use crate::schema::{Configuration, FieldSpec, Schema};

const QUAY_DOMAIN: &str = "quay.io";
const QUAY_TOKEN_URL: &str = "https://quay.io/v2/auth";

/// Robot account configuration. Empty for anonymous pulls.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct QuayConfiguration {
    /// Organization or user owning the robot account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Robot account name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    /// Robot account token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl QuayConfiguration {
    /// `namespace+account` robot user name.
    fn robot(&self) -> Option<(String, &str)> {
        match (&self.namespace, &self.account, &self.token) {
            (Some(namespace), Some(account), Some(token)) => {
                Some((format!("{namespace}+{account}"), token.as_str()))
            }
            _ => None,
        }
    }
}

/// Quay.io provider.
#[derive(Clone)]
pub struct Quay {
    name: String,
    config: QuayConfiguration,
    http: reqwest::Client,
    token_url: String,
}

impl Quay {
    /// Creates a provider from a validated configuration.
    pub fn new(name: impl Into<String>, config: QuayConfiguration, http: reqwest::Client) -> Self {
        Self {
            name: name.into(),
            config,
            http,
            token_url: QUAY_TOKEN_URL.to_string(),
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
            .field(FieldSpec::string("namespace").required())
            .field(FieldSpec::string("account").required())
            .field(FieldSpec::string("token").required().secret())
    }
}

impl fmt::Debug for Quay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Quay")
            .field("name", &self.name)
            .field("namespace", &self.config.namespace)
            .field("account", &self.config.account)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RegistryProvider for Quay {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Quay
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn configuration(&self) -> Configuration {
        untyped(&self.config)
    }

    fn matches(&self, image: &ContainerImage) -> bool {
        host_in_domain(image.host(), QUAY_DOMAIN)
    }

    async fn authenticate(
        &self,
        image: &ContainerImage,
        mut options: RequestOptions,
    ) -> Result<RequestOptions> {
        let url = format!(
            "{}?service=quay.io&scope={}",
            self.token_url,
            pull_scope(&image.name)
        );
        let credentials = self
            .config
            .robot()
            .map(|(user, token)| basic_encode(&user, token));
        let token =
            fetch_bearer_token(&self.http, &self.id(), &url, credentials.as_deref()).await?;
        options.set_bearer(&token)?;
        Ok(options)
    }

    fn auth_pull(&self) -> Option<PullCredentials> {
        self.config
            .robot()
            .map(|(user, token)| PullCredentials::new(user, token))
    }
}
