//! Self-hosted registries speaking the v2 API.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use skopos_core::ContainerImage;

use super::{normalize_v2, untyped, ProviderKind, RegistryProvider};
use crate::error::Result;
use crate::request::{basic_encode, PullCredentials, RequestOptions};
use crate::schema::{Configuration, FieldSpec, Schema};

/// Name of the built-in fallback instance.
const FALLBACK_NAME: &str = "default";

/// Configuration of a self-hosted registry.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CustomConfiguration {
    /// Registry base URL. The fallback instance has none and matches everything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Basic-auth username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    /// Basic-auth password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Pre-encoded `base64(login:password)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
}

/// Self-hosted v2 registry with optional basic auth.
#[derive(Clone)]
pub struct Custom {
    name: String,
    config: CustomConfiguration,
}

impl Custom {
    /// Creates a provider from a validated configuration.
    pub fn new(name: impl Into<String>, config: CustomConfiguration) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    /// The generic provider matching every image, used when no configured
    /// provider matches.
    #[must_use]
    pub fn fallback() -> Self {
        Self::new(FALLBACK_NAME, CustomConfiguration::default())
    }

    /// Configuration schema.
    #[must_use]
    pub fn schema() -> Schema {
        Schema::new()
            .field(FieldSpec::uri("url").required())
            .field(FieldSpec::string("login"))
            .field(FieldSpec::string("password").secret())
            .field(FieldSpec::string("auth").secret())
    }

    fn credentials(&self) -> Option<String> {
        if let Some(auth) = &self.config.auth {
            return Some(auth.clone());
        }
        match (&self.config.login, &self.config.password) {
            (Some(login), Some(password)) => Some(basic_encode(login, password)),
            _ => None,
        }
    }
}

impl fmt::Debug for Custom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Custom")
            .field("name", &self.name)
            .field("url", &self.config.url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RegistryProvider for Custom {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Custom
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn configuration(&self) -> Configuration {
        untyped(&self.config)
    }

    fn matches(&self, image: &ContainerImage) -> bool {
        match &self.config.url {
            Some(url) => {
                let host = image.host();
                !host.is_empty() && url.contains(host)
            }
            None => true,
        }
    }

    fn normalize_image(&self, image: &ContainerImage) -> ContainerImage {
        match &self.config.url {
            Some(url) => {
                let mut normalized = image.clone();
                normalized.registry.url = format!("{}/v2", url.trim_end_matches('/'));
                normalized
            }
            None => normalize_v2(image),
        }
    }

    async fn authenticate(
        &self,
        _image: &ContainerImage,
        mut options: RequestOptions,
    ) -> Result<RequestOptions> {
        if let Some(encoded) = self.credentials() {
            options.set_basic(&encoded)?;
        }
        Ok(options)
    }

    fn auth_pull(&self) -> Option<PullCredentials> {
        match (&self.config.login, &self.config.password) {
            (Some(login), Some(password)) => Some(PullCredentials::new(login, password)),
            _ => None,
        }
    }
}
