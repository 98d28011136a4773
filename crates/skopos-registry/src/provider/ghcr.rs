//! GitHub Container Registry and GHCR-compatible mirrors.
//!
//! LinuxServer.io's `lscr.io` serves the same API as `ghcr.io`, so both are
//! one strategy parameterized by the domain they match and the schema they
//! accept.

use std::fmt;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use skopos_core::ContainerImage;

use super::{host_in_domain, untyped, ProviderKind, RegistryProvider};
use crate::error::Result;
use crate::request::{PullCredentials, RequestOptions};
use crate::schema::{Configuration, FieldSpec, Schema};

const GITHUB_DOMAIN: &str = "ghcr.io";
const LINUXSERVER_DOMAIN: &str = "lscr.io";

/// GHCR configuration. Empty for anonymous pulls (GitHub only).
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct GhcrConfiguration {
    /// GitHub user name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Personal access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// GHCR-style provider.
#[derive(Clone)]
pub struct Ghcr {
    kind: ProviderKind,
    domain: &'static str,
    name: String,
    config: GhcrConfiguration,
}

impl Ghcr {
    /// Provider for `ghcr.io`.
    pub fn github(name: impl Into<String>, config: GhcrConfiguration) -> Self {
        Self {
            kind: ProviderKind::Ghcr,
            domain: GITHUB_DOMAIN,
            name: name.into(),
            config,
        }
    }

    /// Provider for `lscr.io`.
    pub fn linuxserver(name: impl Into<String>, config: GhcrConfiguration) -> Self {
        Self {
            kind: ProviderKind::Lscr,
            domain: LINUXSERVER_DOMAIN,
            name: name.into(),
            config,
        }
    }

    /// Schema of `ghcr` entries.
    #[must_use]
    pub fn github_schema() -> Schema {
        Schema::new()
            .allow_empty()
            .field(FieldSpec::string("username"))
            .field(FieldSpec::string("token").secret())
    }

    /// Schema of `lscr` entries.
    #[must_use]
    pub fn linuxserver_schema() -> Schema {
        Schema::new()
            .field(FieldSpec::string("username").required())
            .field(FieldSpec::string("token").required().secret())
    }

    /// Domain this instance matches.
    #[must_use]
    pub const fn domain(&self) -> &'static str {
        self.domain
    }

    fn bearer(&self) -> String {
        let raw = self.config.token.as_deref().unwrap_or(":");
        base64::engine::general_purpose::STANDARD.encode(raw)
    }
}

impl fmt::Debug for Ghcr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ghcr")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("username", &self.config.username)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RegistryProvider for Ghcr {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn configuration(&self) -> Configuration {
        untyped(&self.config)
    }

    fn matches(&self, image: &ContainerImage) -> bool {
        host_in_domain(image.host(), self.domain)
    }

    async fn authenticate(
        &self,
        _image: &ContainerImage,
        mut options: RequestOptions,
    ) -> Result<RequestOptions> {
        options.set_bearer(&self.bearer())?;
        Ok(options)
    }

    fn auth_pull(&self) -> Option<PullCredentials> {
        match (&self.config.username, &self.config.token) {
            (Some(username), Some(token)) => Some(PullCredentials::new(username, token)),
            _ => None,
        }
    }
}
