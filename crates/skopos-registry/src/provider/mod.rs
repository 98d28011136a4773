//! Registry providers.
//!
//! A provider is one configured registry backend: it knows which images it
//! is responsible for, how to rewrite their registry URL into the `/v2`
//! endpoint, and how to authorize requests against it. The set of backends is
//! closed: [`ProviderKind`] enumerates them and [`Provider`] holds one
//! configured instance of any of them.

mod custom;
mod ecr;
mod gcr;
mod ghcr;
mod gitlab;
mod hub;
mod quay;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use skopos_core::ContainerImage;

use crate::error::{RegistryError, Result};
use crate::request::{PullCredentials, RequestOptions};
use crate::schema::{Configuration, Schema};

pub use custom::{Custom, CustomConfiguration};
pub use ecr::{
    AwsEcrTokenSource, Ecr, EcrConfiguration, EcrCredentials, EcrTokenSource,
    ECR_PUBLIC_GALLERY_HOSTNAME,
};
pub use gcr::{Gcr, GcrConfiguration};
pub use ghcr::{Ghcr, GhcrConfiguration};
pub use gitlab::{Gitlab, GitlabConfiguration};
pub use hub::{Hub, HubConfiguration};
pub use quay::{Quay, QuayConfiguration};

/// Registry backend families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Any self-hosted registry speaking the v2 API.
    Custom,
    /// Docker Hub.
    Hub,
    /// AWS Elastic Container Registry (private and public gallery).
    Ecr,
    /// Google Container Registry.
    Gcr,
    /// GitHub Container Registry.
    Ghcr,
    /// LinuxServer.io registry, a GHCR-compatible mirror.
    Lscr,
    /// Gitlab Container Registry.
    Gitlab,
    /// Quay.io.
    Quay,
}

impl ProviderKind {
    /// All provider kinds.
    pub const ALL: [Self; 8] = [
        Self::Custom,
        Self::Hub,
        Self::Ecr,
        Self::Gcr,
        Self::Ghcr,
        Self::Lscr,
        Self::Gitlab,
        Self::Quay,
    ];

    /// Configuration key of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::Hub => "hub",
            Self::Ecr => "ecr",
            Self::Gcr => "gcr",
            Self::Ghcr => "ghcr",
            Self::Lscr => "lscr",
            Self::Gitlab => "gitlab",
            Self::Quay => "quay",
        }
    }

    /// Configuration schema of this kind.
    #[must_use]
    pub fn schema(self) -> Schema {
        match self {
            Self::Custom => Custom::schema(),
            Self::Hub => Hub::schema(),
            Self::Ecr => Ecr::schema(),
            Self::Gcr => Gcr::schema(),
            Self::Ghcr => Ghcr::github_schema(),
            Self::Lscr => Ghcr::linuxserver_schema(),
            Self::Gitlab => Gitlab::schema(),
            Self::Quay => Quay::schema(),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| RegistryError::UnknownProvider {
                kind: s.to_string(),
            })
    }
}

/// Identity and masked configuration of a provider, for display only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderDescriptor {
    /// `<kind>.<name>`.
    pub id: String,
    /// Backend family.
    pub kind: ProviderKind,
    /// Name of the configuration entry.
    pub name: String,
    /// Configuration with every credential masked.
    pub configuration: Configuration,
}

/// Capability set every registry backend implements.
#[async_trait]
pub trait RegistryProvider: Send + Sync + fmt::Debug {
    /// Backend family.
    fn kind(&self) -> ProviderKind;

    /// Name of the configuration entry this instance was built from.
    fn name(&self) -> &str;

    /// Unique identifier, `<kind>.<name>`.
    fn id(&self) -> String {
        format!("{}.{}", self.kind(), self.name())
    }

    /// Validated configuration, unmasked.
    fn configuration(&self) -> Configuration;

    /// Validated configuration with every credential masked.
    fn mask_configuration(&self) -> Configuration {
        self.kind().schema().mask(&self.configuration())
    }

    /// Returns true if this provider handles `image`. Never performs I/O.
    fn matches(&self, image: &ContainerImage) -> bool;

    /// Returns a copy of `image` with its registry URL in `https://…/v2` form.
    ///
    /// Applying it to an already normalized image returns it unchanged.
    fn normalize_image(&self, image: &ContainerImage) -> ContainerImage {
        normalize_v2(image)
    }

    /// Decorates `options` with the credentials the backend expects.
    async fn authenticate(
        &self,
        image: &ContainerImage,
        options: RequestOptions,
    ) -> Result<RequestOptions>;

    /// Static credentials for Docker-style basic-auth pulls.
    fn auth_pull(&self) -> Option<PullCredentials>;

    /// Identity and masked configuration for display.
    fn descriptor(&self) -> ProviderDescriptor {
        ProviderDescriptor {
            id: self.id(),
            kind: self.kind(),
            name: self.name().to_string(),
            configuration: self.mask_configuration(),
        }
    }
}

/// Shared collaborators handed to providers at construction.
#[derive(Debug, Clone)]
pub struct ProviderContext {
    /// HTTP client used for token endpoints.
    pub http: reqwest::Client,
    /// Source of ECR IAM authorization tokens.
    pub ecr_tokens: Arc<dyn EcrTokenSource>,
}

impl ProviderContext {
    /// Creates a context around an existing HTTP client.
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            ecr_tokens: Arc::new(AwsEcrTokenSource::new()),
        }
    }

    /// Replaces the ECR token source.
    #[must_use]
    pub fn with_ecr_tokens(mut self, source: Arc<dyn EcrTokenSource>) -> Self {
        self.ecr_tokens = source;
        self
    }
}

impl Default for ProviderContext {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

/// One configured registry backend.
#[derive(Debug)]
pub enum Provider {
    /// Self-hosted v2 registry, also used as the unconditional fallback.
    Custom(Custom),
    /// Docker Hub.
    Hub(Hub),
    /// AWS ECR.
    Ecr(Ecr),
    /// Google Container Registry.
    Gcr(Gcr),
    /// GHCR and GHCR-compatible mirrors (LSCR).
    Ghcr(Ghcr),
    /// Gitlab.
    Gitlab(Gitlab),
    /// Quay.io.
    Quay(Quay),
}

impl Provider {
    /// Validates `raw` against the schema of `kind` and builds the provider.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Configuration`] naming the offending field if
    /// the configuration does not satisfy the schema.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::json;
    /// use skopos_core::ContainerImage;
    /// use skopos_registry::{Provider, ProviderContext, ProviderKind, RegistryProvider};
    ///
    /// let provider = Provider::build(
    ///     ProviderKind::Ecr,
    ///     "private",
    ///     &json!({
    ///         "accesskeyid": "AKIA",
    ///         "secretaccesskey": "secret",
    ///         "region": "us-east-1",
    ///         "accountid": "123456789",
    ///     }),
    ///     &ProviderContext::default(),
    /// )
    /// .unwrap();
    ///
    /// let image = ContainerImage::new("app", "123456789.dkr.ecr.us-east-1.amazonaws.com");
    /// assert!(provider.matches(&image));
    /// assert_eq!(provider.id(), "ecr.private");
    /// ```
    pub fn build(
        kind: ProviderKind,
        name: &str,
        raw: &Value,
        context: &ProviderContext,
    ) -> Result<Self> {
        let configuration =
            kind.schema()
                .validate(raw)
                .map_err(|source| RegistryError::Configuration {
                    provider: format!("{kind}.{name}"),
                    source,
                })?;

        let provider = match kind {
            ProviderKind::Custom => Self::Custom(Custom::new(name, typed(configuration)?)),
            ProviderKind::Hub => {
                Self::Hub(Hub::new(name, typed(configuration)?, context.http.clone()))
            }
            ProviderKind::Ecr => Self::Ecr(Ecr::new(name, typed(configuration)?, context)?),
            ProviderKind::Gcr => {
                Self::Gcr(Gcr::new(name, typed(configuration)?, context.http.clone()))
            }
            ProviderKind::Ghcr => Self::Ghcr(Ghcr::github(name, typed(configuration)?)),
            ProviderKind::Lscr => Self::Ghcr(Ghcr::linuxserver(name, typed(configuration)?)),
            ProviderKind::Gitlab => {
                Self::Gitlab(Gitlab::new(name, typed(configuration)?, context.http.clone()))
            }
            ProviderKind::Quay => {
                Self::Quay(Quay::new(name, typed(configuration)?, context.http.clone()))
            }
        };

        tracing::debug!(provider = %provider.id(), "Registry provider configured");
        Ok(provider)
    }

    /// The generic provider that matches every image.
    #[must_use]
    pub fn fallback() -> Self {
        Self::Custom(Custom::fallback())
    }

    fn inner(&self) -> &dyn RegistryProvider {
        match self {
            Self::Custom(p) => p,
            Self::Hub(p) => p,
            Self::Ecr(p) => p,
            Self::Gcr(p) => p,
            Self::Ghcr(p) => p,
            Self::Gitlab(p) => p,
            Self::Quay(p) => p,
        }
    }
}

#[async_trait]
impl RegistryProvider for Provider {
    fn kind(&self) -> ProviderKind {
        self.inner().kind()
    }

    fn name(&self) -> &str {
        self.inner().name()
    }

    fn configuration(&self) -> Configuration {
        self.inner().configuration()
    }

    fn mask_configuration(&self) -> Configuration {
        self.inner().mask_configuration()
    }

    fn matches(&self, image: &ContainerImage) -> bool {
        self.inner().matches(image)
    }

    fn normalize_image(&self, image: &ContainerImage) -> ContainerImage {
        self.inner().normalize_image(image)
    }

    async fn authenticate(
        &self,
        image: &ContainerImage,
        options: RequestOptions,
    ) -> Result<RequestOptions> {
        self.inner().authenticate(image, options).await
    }

    fn auth_pull(&self) -> Option<PullCredentials> {
        self.inner().auth_pull()
    }
}

/// Rewrites a bare registry URL into `https://<url>/v2`.
///
/// URLs that already carry a scheme are left untouched, which makes the
/// rewrite idempotent.
///
/// # Examples
///
/// ```
/// use skopos_core::ContainerImage;
/// use skopos_registry::provider::normalize_v2;
///
/// let image = ContainerImage::new("test/image", "eu.gcr.io/test/image");
/// let normalized = normalize_v2(&image);
/// assert_eq!(normalized.registry.url, "https://eu.gcr.io/test/image/v2");
/// assert_eq!(normalize_v2(&normalized), normalized);
/// ```
#[must_use]
pub fn normalize_v2(image: &ContainerImage) -> ContainerImage {
    let mut normalized = image.clone();
    if !normalized.has_scheme() {
        normalized.registry.url = format!("https://{}/v2", normalized.registry.url);
    }
    normalized
}

/// Returns true if `host` is `domain` or one of its subdomains.
pub(crate) fn host_in_domain(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.len() > 1 && prefix.ends_with('.'))
}

/// Converts a validated configuration into its typed form.
fn typed<T: DeserializeOwned>(configuration: Configuration) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(configuration))?)
}

/// Converts a typed configuration back into its key/value form.
pub(crate) fn untyped<T: Serialize>(configuration: &T) -> Configuration {
    match serde_json::to_value(configuration) {
        Ok(Value::Object(map)) => map,
        _ => Configuration::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.as_str().parse::<ProviderKind>().unwrap(), kind);
        }
        assert_eq!("GHCR".parse::<ProviderKind>().unwrap(), ProviderKind::Ghcr);
        assert!("artifactory".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_normalize_v2_is_idempotent() {
        let image = ContainerImage::new("acme/app", "ghcr.io");
        let once = normalize_v2(&image);
        assert_eq!(once.registry.url, "https://ghcr.io/v2");
        assert_eq!(normalize_v2(&once), once);
    }

    #[test]
    fn test_normalize_v2_keeps_http_urls() {
        let image = ContainerImage::new("app", "http://registry.local:5000/v2");
        assert_eq!(normalize_v2(&image), image);
    }

    #[test]
    fn test_host_in_domain() {
        assert!(host_in_domain("gcr.io", "gcr.io"));
        assert!(host_in_domain("eu.gcr.io", "gcr.io"));
        assert!(!host_in_domain("grr.io", "gcr.io"));
        assert!(!host_in_domain("evilgcr.io", "gcr.io"));
        assert!(!host_in_domain(".gcr.io", "gcr.io"));
    }

    #[test]
    fn test_build_reports_field_of_invalid_configuration() {
        let err = Provider::build(
            ProviderKind::Gcr,
            "private",
            &json!({}),
            &ProviderContext::default(),
        )
        .unwrap_err();
        match err {
            RegistryError::Configuration { provider, source } => {
                assert_eq!(provider, "gcr.private");
                assert_eq!(source.field, "clientemail");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_build_lscr_uses_ghcr_strategy() {
        let provider = Provider::build(
            ProviderKind::Lscr,
            "private",
            &json!({ "username": "user", "token": "token" }),
            &ProviderContext::default(),
        )
        .unwrap();
        assert!(matches!(provider, Provider::Ghcr(_)));
        assert_eq!(provider.kind(), ProviderKind::Lscr);
        assert_eq!(provider.id(), "lscr.private");
    }

    #[test]
    fn test_descriptor_is_masked() {
        let provider = Provider::build(
            ProviderKind::Gitlab,
            "private",
            &json!({ "token": "glpat-abcdef" }),
            &ProviderContext::default(),
        )
        .unwrap();
        let descriptor = provider.descriptor();
        assert_eq!(descriptor.id, "gitlab.private");
        assert_eq!(descriptor.configuration["token"], json!("g**********f"));
        assert_eq!(descriptor.configuration["url"], json!("https://registry.gitlab.com"));
    }

    #[test]
    fn test_fallback_matches_everything() {
        let fallback = Provider::fallback();
        assert_eq!(fallback.id(), "custom.default");
        assert!(fallback.matches(&ContainerImage::new("a", "registry.example.com")));
        assert!(fallback.matches(&ContainerImage::new("a", "")));
    }
}
