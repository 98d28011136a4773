//! Resolve command implementation.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use skopos_core::ContainerImage;
use skopos_registry::{RegistryProvider, Resolver};

use super::{parse_image, GlobalArgs, OutputFormat};

/// Arguments for the resolve command.
#[derive(Args)]
pub struct ResolveArgs {
    /// Image reference (e.g. `ghcr.io/acme/api:1.4.2`)
    pub image: String,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Resolution result.
#[derive(Debug, Serialize)]
pub struct Resolution {
    pub provider: String,
    pub image: ContainerImage,
    pub normalized: ContainerImage,
}

/// Runs the resolve command.
pub fn run(global: &GlobalArgs, args: &ResolveArgs) -> Result<()> {
    let image = parse_image(&args.image)?;
    let resolution = resolve(&global.resolver()?, image);

    match args.format {
        OutputFormat::Text => {
            println!("Provider:   {}", resolution.provider);
            println!("Repository: {}", resolution.normalized.name);
            println!("Endpoint:   {}", resolution.normalized.registry.url);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&resolution)?),
    }
    Ok(())
}

fn resolve(resolver: &Resolver, image: ContainerImage) -> Resolution {
    let provider = resolver.resolve(&image);
    Resolution {
        provider: provider.id(),
        normalized: provider.normalize_image(&image),
        image,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skopos_registry::{ProviderContext, RegistrySettings};

    #[test]
    fn test_resolve_anonymous_hub_image() {
        let resolver = Resolver::from_settings(&RegistrySettings::new(), &ProviderContext::default());
        let resolution = resolve(&resolver, parse_image("nginx:1.27").unwrap());

        assert_eq!(resolution.provider, "hub.public");
        assert_eq!(resolution.normalized.name, "library/nginx");
        assert_eq!(resolution.normalized.registry.url, "https://registry-1.docker.io/v2");
        assert_eq!(resolution.image.registry.url, "docker.io");
    }
}
