//! Container image descriptors.
//!
//! A [`ContainerImage`] is what the watcher hands to the registry layer: the
//! repository name, an optional tag or digest, and the registry the image was
//! pulled from. The registry URL starts out as a bare hostname (possibly with
//! a path) and is rewritten into its `https://…/v2` form by the provider that
//! matches it.

use oci_distribution::Reference;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Registry attached to a container image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRef {
    /// Identifier of the registry provider handling this image (may be empty
    /// until the image has been resolved).
    #[serde(default)]
    pub name: String,

    /// Registry endpoint, either a bare host (`eu.gcr.io`) or a normalized
    /// URL (`https://eu.gcr.io/v2`).
    pub url: String,
}

impl RegistryRef {
    /// Creates a registry reference with an empty provider name.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            url: url.into(),
        }
    }
}

/// A container image watched for updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerImage {
    /// Repository name (e.g. `library/nginx`, `acme/api`).
    pub name: String,

    /// Tag, if the image was referenced by tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Content digest, if the image was referenced by digest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    /// Registry the image belongs to.
    pub registry: RegistryRef,
}

impl ContainerImage {
    /// Creates an image descriptor for `name` hosted at `registry_url`.
    ///
    /// # Examples
    ///
    /// ```
    /// use skopos_core::ContainerImage;
    ///
    /// let image = ContainerImage::new("test/image", "eu.gcr.io");
    /// assert_eq!(image.registry.url, "eu.gcr.io");
    /// assert!(image.tag.is_none());
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>, registry_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: None,
            digest: None,
            registry: RegistryRef::new(registry_url),
        }
    }

    /// Sets the tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Sets the digest.
    #[must_use]
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }

    /// Parses an image reference of the form `[host[:port]/]path[:tag][@digest]`,
    /// following the distribution reference grammar.
    ///
    /// References without a host belong to Docker Hub, and single-component
    /// Hub repositories live under `library/`. References without tag and
    /// digest get the `latest` tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidImageReference`] if the reference does not
    /// match the grammar or carries a malformed digest.
    ///
    /// # Examples
    ///
    /// ```
    /// use skopos_core::ContainerImage;
    ///
    /// let image = ContainerImage::parse("nginx").unwrap();
    /// assert_eq!(image.registry.url, "docker.io");
    /// assert_eq!(image.name, "library/nginx");
    /// assert_eq!(image.tag.as_deref(), Some("latest"));
    ///
    /// let digest = format!("sha256:{}", "a".repeat(64));
    /// let image = ContainerImage::parse(&format!("localhost:5000/tools/app@{digest}")).unwrap();
    /// assert_eq!(image.registry.url, "localhost:5000");
    /// assert_eq!(image.digest.as_deref(), Some(digest.as_str()));
    /// assert!(image.tag.is_none());
    /// ```
    pub fn parse(reference: &str) -> Result<Self> {
        let parsed =
            Reference::try_from(reference.trim()).map_err(|e| Error::InvalidImageReference {
                reference: reference.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self::from(&parsed))
    }

    /// Returns the registry host, without scheme and without any path.
    ///
    /// # Examples
    ///
    /// ```
    /// use skopos_core::ContainerImage;
    ///
    /// let image = ContainerImage::new("test/image", "https://eu.gcr.io/test/image/v2");
    /// assert_eq!(image.host(), "eu.gcr.io");
    /// ```
    #[must_use]
    pub fn host(&self) -> &str {
        let url = self.registry.url.as_str();
        let without_scheme = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .unwrap_or(url);
        without_scheme
            .split_once('/')
            .map_or(without_scheme, |(host, _)| host)
    }

    /// Returns true if the registry URL already carries an HTTP scheme.
    #[must_use]
    pub fn has_scheme(&self) -> bool {
        self.registry.url.starts_with("https://") || self.registry.url.starts_with("http://")
    }
}

impl From<&Reference> for ContainerImage {
    fn from(reference: &Reference) -> Self {
        Self {
            name: reference.repository().to_string(),
            tag: reference.tag().map(str::to_string),
            digest: reference.digest().map(str::to_string),
            registry: RegistryRef::new(reference.registry()),
        }
    }
}
