//! CLI commands and argument parsing.

pub mod auth;
pub mod registries;
pub mod resolve;
pub mod schema;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use skopos_core::ContainerImage;
use skopos_registry::{ProviderContext, RegistrySettings, Resolver};

/// Skopos - container image update watcher
#[derive(Parser)]
#[command(name = "skopos")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
#[derive(Args)]
pub struct GlobalArgs {
    /// Settings file (JSON with a top-level `registry` object)
    #[arg(long, global = true, env = "SKOPOS_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "SKOPOS_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl GlobalArgs {
    /// Tracing filter directive for Skopos crates.
    pub fn log_filter(&self) -> String {
        let level = &self.log_level;
        format!("skopos={level},skopos_registry={level},skopos_core={level}")
    }

    /// Loads settings from the settings file and the process environment.
    pub fn settings(&self) -> Result<RegistrySettings> {
        RegistrySettings::load(self.config.as_deref(), std::env::vars())
            .context("Failed to load registry settings")
    }

    /// Builds a resolver from the loaded settings.
    pub fn resolver(&self) -> Result<Resolver> {
        let settings = self.settings()?;
        Ok(Resolver::from_settings(&settings, &ProviderContext::default()))
    }
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// List configured registries with masked credentials
    Registries(registries::RegistriesArgs),

    /// Show which registry handles an image and its normalized endpoint
    Resolve(resolve::ResolveArgs),

    /// Authenticate against the registry of an image
    Auth(auth::AuthArgs),

    /// Print the configuration schema of a registry kind
    Schema(schema::SchemaArgs),

    /// Print version information
    Version,
}

/// Output format.
#[derive(Clone, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Parses an image reference argument.
pub fn parse_image(reference: &str) -> Result<ContainerImage> {
    ContainerImage::parse(reference).with_context(|| format!("Invalid image reference '{reference}'"))
}
