//! # Skopos Registry
//!
//! Registry resolution and authentication for the Skopos image update watcher.
//!
//! Given a [`ContainerImage`](skopos_core::ContainerImage), this crate picks
//! the registry backend responsible for it, rewrites its registry URL into the
//! canonical `https://<host>/v2` form, and decorates outgoing HTTP requests
//! with whatever credential that backend expects.
//!
//! ## Features
//!
//! - **Closed provider set**: self-hosted v2, Docker Hub, ECR (private and
//!   public gallery), GCR, GHCR, LSCR, Gitlab and Quay
//! - **Declarative schemas**: validation, default filling and credential masking
//! - **Token caching**: single-flight cache for expiring IAM tokens
//! - **Layered settings**: JSON file plus `SKOPOS_REGISTRY_*` environment
//!   variables and `__FILE` secrets
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use skopos_core::ContainerImage;
//! use skopos_registry::{
//!     ProviderContext, RegistryProvider, RegistrySettings, RequestOptions, SharedResolver,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = RegistrySettings::load(None, std::env::vars())?;
//!     let resolver = SharedResolver::from_settings(&settings, ProviderContext::default());
//!
//!     let image = ContainerImage::parse("ghcr.io/acme/api:1.4.2")?;
//!     let provider = resolver.resolve(&image);
//!     let normalized = provider.normalize_image(&image);
//!     let options = provider.authenticate(&normalized, RequestOptions::new()).await?;
//!
//!     let url = format!("{}/{}/tags/list", normalized.registry.url, normalized.name);
//!     let response = options.apply(reqwest::Client::new().get(url)).send().await?;
//!     println!("{}", response.status());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     SharedResolver                          │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │ Resolver (immutable per configuration version)       │   │
//! │  │   [Provider, Provider, ...] ─► custom.default        │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//!                          │ resolve(image)
//!                          ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │ Provider: matches / normalize_image / authenticate          │
//! │   ├── TokenCache (ECR IAM tokens)                           │
//! │   └── token endpoints (Hub, GCR, Gitlab, Quay, ECR public)  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod exchange;
pub mod provider;
mod request;
mod resolver;
pub mod schema;
mod token;

pub use config::{
    RegistrySettings, CONFIG_FILE_ENV, DEFAULT_CONFIG_FILE, ENV_PREFIX, LOG_LEVEL_ENV,
};
pub use error::{RegistryError, Result};
pub use provider::{
    Provider, ProviderContext, ProviderDescriptor, ProviderKind, RegistryProvider,
};
pub use request::{basic_encode, PullCredentials, RequestOptions};
pub use resolver::{Resolver, SharedResolver, ANONYMOUS_KINDS, ANONYMOUS_NAME};
pub use schema::{Configuration, FieldKind, FieldSpec, Schema};
pub use token::{AuthToken, TokenCache};
