//! Provider selection.
//!
//! A [`Resolver`] is built once per configuration version and never mutated.
//! It hands out `Arc<Provider>` so an in-flight authentication keeps its
//! provider alive across a reload. [`SharedResolver`] owns the current
//! version and swaps in a new one on reload.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use skopos_core::ContainerImage;

use crate::config::RegistrySettings;
use crate::provider::{Provider, ProviderContext, ProviderDescriptor, ProviderKind, RegistryProvider};

/// Name of the anonymous entries added for undeclared kinds.
pub const ANONYMOUS_NAME: &str = "public";

/// Kinds that get an anonymous entry when none is declared.
pub const ANONYMOUS_KINDS: [ProviderKind; 4] = [
    ProviderKind::Hub,
    ProviderKind::Ghcr,
    ProviderKind::Gcr,
    ProviderKind::Quay,
];

/// Ordered set of configured providers plus the generic fallback.
#[derive(Debug)]
pub struct Resolver {
    providers: Vec<Arc<Provider>>,
    fallback: Arc<Provider>,
}

impl Resolver {
    /// Creates a resolver trying `providers` in order.
    ///
    /// Providers sharing an id are dropped after the first.
    #[must_use]
    pub fn new(providers: impl IntoIterator<Item = Provider>) -> Self {
        let mut seen = HashSet::new();
        let providers = providers
            .into_iter()
            .filter(|provider| {
                let id = provider.id();
                let first = seen.insert(id.clone());
                if !first {
                    tracing::warn!(provider = %id, "Duplicate registry provider ignored");
                }
                first
            })
            .map(Arc::new)
            .collect();

        Self {
            providers,
            fallback: Arc::new(Provider::fallback()),
        }
    }

    /// Builds providers from settings.
    ///
    /// Entries of unknown kinds and entries failing validation are logged and
    /// skipped. Kinds in [`ANONYMOUS_KINDS`] without any declared entry get an
    /// anonymous `<kind>.public` provider after the declared ones.
    #[must_use]
    pub fn from_settings(settings: &RegistrySettings, context: &ProviderContext) -> Self {
        let mut providers = Vec::new();

        for (kind, name, raw) in settings.entries() {
            let kind = match kind.parse::<ProviderKind>() {
                Ok(kind) => kind,
                Err(e) => {
                    tracing::warn!(name, error = %e, "Skipping registry entry");
                    continue;
                }
            };
            match Provider::build(kind, name, raw, context) {
                Ok(provider) => providers.push(provider),
                Err(e) => tracing::warn!(error = %e, "Skipping registry entry"),
            }
        }

        for kind in ANONYMOUS_KINDS {
            if settings.declares_kind(kind.as_str()) {
                continue;
            }
            match Provider::build(kind, ANONYMOUS_NAME, &Value::String(String::new()), context) {
                Ok(provider) => providers.push(provider),
                Err(e) => tracing::warn!(%kind, error = %e, "Anonymous registry unavailable"),
            }
        }

        let resolver = Self::new(providers);
        tracing::info!(
            providers = ?resolver.providers.iter().map(|p| p.id()).collect::<Vec<_>>(),
            "Registry providers loaded"
        );
        resolver
    }

    /// Returns the first provider matching `image`, or the fallback.
    #[must_use]
    pub fn resolve(&self, image: &ContainerImage) -> Arc<Provider> {
        let provider = self
            .providers
            .iter()
            .find(|provider| provider.matches(image))
            .unwrap_or(&self.fallback);
        tracing::debug!(
            image = %image.name,
            registry = %image.registry.url,
            provider = %provider.id(),
            "Resolved registry provider"
        );
        Arc::clone(provider)
    }

    /// Configured providers in match order, fallback excluded.
    #[must_use]
    pub fn providers(&self) -> &[Arc<Provider>] {
        &self.providers
    }

    /// The provider used when nothing else matches.
    #[must_use]
    pub fn fallback(&self) -> &Arc<Provider> {
        &self.fallback
    }

    /// Looks a provider up by id, fallback included.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<Provider>> {
        self.providers
            .iter()
            .chain(std::iter::once(&self.fallback))
            .find(|provider| provider.id() == id)
            .cloned()
    }

    /// Masked descriptors of every provider in match order, fallback last.
    #[must_use]
    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.providers
            .iter()
            .chain(std::iter::once(&self.fallback))
            .map(|provider| provider.descriptor())
            .collect()
    }
}

/// Reloadable handle on the current [`Resolver`].
#[derive(Debug)]
pub struct SharedResolver {
    current: RwLock<Arc<Resolver>>,
    context: ProviderContext,
}

impl SharedResolver {
    /// Wraps an existing resolver.
    #[must_use]
    pub fn new(resolver: Resolver, context: ProviderContext) -> Self {
        Self {
            current: RwLock::new(Arc::new(resolver)),
            context,
        }
    }

    /// Builds the initial resolver from settings.
    #[must_use]
    pub fn from_settings(settings: &RegistrySettings, context: ProviderContext) -> Self {
        let resolver = Resolver::from_settings(settings, &context);
        Self::new(resolver, context)
    }

    /// Current configuration version.
    #[must_use]
    pub fn current(&self) -> Arc<Resolver> {
        Arc::clone(&self.current.read())
    }

    /// Resolves `image` against the current version.
    #[must_use]
    pub fn resolve(&self, image: &ContainerImage) -> Arc<Provider> {
        self.current().resolve(image)
    }

    /// Rebuilds providers from `settings` and swaps them in.
    ///
    /// Providers already handed out stay usable until dropped.
    pub fn reload(&self, settings: &RegistrySettings) {
        let resolver = Arc::new(Resolver::from_settings(settings, &self.context));
        *self.current.write() = resolver;
        tracing::info!("Registry configuration reloaded");
    }

    /// Masked descriptors of the current version.
    #[must_use]
    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.current().descriptors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(resolver: &Resolver) -> Vec<String> {
        resolver.providers().iter().map(|p| p.id()).collect()
    }

    #[test]
    fn test_empty_settings_use_anonymous_defaults() {
        let resolver = Resolver::from_settings(&RegistrySettings::new(), &ProviderContext::default());
        assert_eq!(ids(&resolver), ["hub.public", "ghcr.public", "gcr.public", "quay.public"]);
        assert_eq!(resolver.fallback().id(), "custom.default");
    }

    #[test]
    fn test_declared_kind_suppresses_anonymous_entry() {
        let settings = RegistrySettings::new().with_entry(
            "hub",
            "private",
            json!({ "login": "login", "token": "token" }),
        );
        let resolver = Resolver::from_settings(&settings, &ProviderContext::default());
        assert_eq!(ids(&resolver), ["hub.private", "ghcr.public", "gcr.public", "quay.public"]);
    }

    #[test]
    fn test_invalid_and_unknown_entries_are_skipped() {
        let settings = RegistrySettings::new()
            .with_entry("artifactory", "private", json!({}))
            .with_entry("gitlab", "broken", json!({}))
            .with_entry("gitlab", "private", json!({ "token": "t" }));
        let resolver = Resolver::from_settings(&settings, &ProviderContext::default());
        assert_eq!(ids(&resolver)[0], "gitlab.private");
        assert!(resolver.get("gitlab.broken").is_none());
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let context = ProviderContext::default();
        let first = Provider::build(
            ProviderKind::Custom,
            "local",
            &json!({ "url": "https://one.example.com" }),
            &context,
        )
        .unwrap();
        let second = Provider::build(
            ProviderKind::Custom,
            "local",
            &json!({ "url": "https://two.example.com" }),
            &context,
        )
        .unwrap();

        let resolver = Resolver::new([first, second]);
        assert_eq!(resolver.providers().len(), 1);
        assert_eq!(
            resolver.get("custom.local").unwrap().configuration()["url"],
            "https://one.example.com"
        );
    }

    #[test]
    fn test_declaration_order_breaks_ties() {
        let context = ProviderContext::default();
        let mirror = Provider::build(
            ProviderKind::Custom,
            "mirror",
            &json!({ "url": "https://ghcr.io" }),
            &context,
        )
        .unwrap();
        let github = Provider::build(ProviderKind::Ghcr, "private", &json!(""), &context).unwrap();
        let image = ContainerImage::new("acme/app", "ghcr.io");

        let resolver = Resolver::new([mirror, github]);
        assert_eq!(resolver.resolve(&image).id(), "custom.mirror");

        let mirror = Provider::build(
            ProviderKind::Custom,
            "mirror",
            &json!({ "url": "https://ghcr.io" }),
            &context,
        )
        .unwrap();
        let github = Provider::build(ProviderKind::Ghcr, "private", &json!(""), &context).unwrap();
        let resolver = Resolver::new([github, mirror]);
        assert_eq!(resolver.resolve(&image).id(), "ghcr.private");
    }

    #[test]
    fn test_unmatched_image_uses_fallback() {
        let resolver = Resolver::from_settings(&RegistrySettings::new(), &ProviderContext::default());
        let provider = resolver.resolve(&ContainerImage::new("app", "registry.internal:5000"));
        assert_eq!(provider.id(), "custom.default");
    }

    #[test]
    fn test_descriptors_end_with_fallback() {
        let resolver = Resolver::new(Vec::new());
        let descriptors = resolver.descriptors();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].id, "custom.default");
    }

    #[test]
    fn test_reload_swaps_version_and_keeps_old_providers_alive() {
        let shared = SharedResolver::from_settings(&RegistrySettings::new(), ProviderContext::default());
        let image = ContainerImage::new("group/app", "registry.gitlab.com");
        let before = shared.resolve(&image);
        assert_eq!(before.id(), "custom.default");

        shared.reload(
            &RegistrySettings::new().with_entry("gitlab", "private", json!({ "token": "t" })),
        );

        assert_eq!(shared.resolve(&image).id(), "gitlab.private");
        assert_eq!(before.id(), "custom.default");
        assert_eq!(shared.descriptors()[0].id, "gitlab.private");
    }
}
