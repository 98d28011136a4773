//! Auth command implementation.
//!
//! Runs the full resolve / normalize / authenticate chain for one image and
//! prints the resulting credentials masked.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use skopos_core::mask;
use skopos_registry::{PullCredentials, RegistryProvider, RequestOptions};

use super::{parse_image, GlobalArgs};

/// Arguments for the auth command.
#[derive(Args)]
pub struct AuthArgs {
    /// Image reference (e.g. `123456789.dkr.ecr.eu-west-1.amazonaws.com/api:1.0`)
    pub image: String,

    /// Also print the static pull credentials
    #[arg(long)]
    pub pull: bool,
}

/// Runs the auth command.
///
/// # Errors
///
/// Returns an error if the settings cannot be loaded or the registry rejects
/// the credentials.
pub async fn run(global: &GlobalArgs, args: &AuthArgs) -> Result<()> {
    let image = parse_image(&args.image)?;
    let resolver = global.resolver()?;
    let provider = resolver.resolve(&image);
    let normalized = provider.normalize_image(&image);

    info!(provider = %provider.id(), endpoint = %normalized.registry.url, "Authenticating");
    let options = provider
        .authenticate(&normalized, RequestOptions::new())
        .await
        .with_context(|| format!("Authentication against {} failed", provider.id()))?;

    println!("Provider:      {}", provider.id());
    println!("Endpoint:      {}", normalized.registry.url);
    println!(
        "Authorization: {}",
        options.authorization().map_or_else(|| "(none)".to_string(), mask_authorization)
    );

    if args.pull {
        println!(
            "Pull:          {}",
            provider
                .auth_pull()
                .map_or_else(|| "(none)".to_string(), |c| mask_pull(&c))
        );
    }
    Ok(())
}

/// Masks the credential part of an `Authorization` value, keeping the scheme.
fn mask_authorization(value: &str) -> String {
    match value.split_once(' ') {
        Some((scheme, credential)) => format!("{scheme} {}", mask(credential)),
        None => mask(value),
    }
}

fn mask_pull(credentials: &PullCredentials) -> String {
    format!("{} / {}", credentials.username, mask(&credentials.password))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_authorization_keeps_scheme() {
        assert_eq!(mask_authorization("Bearer xxxxx"), "Bearer x***x");
        assert_eq!(mask_authorization("opaque"), "o****e");
    }

    #[test]
    fn test_mask_pull() {
        let credentials = PullCredentials::new("acme+ci", "robot-token");
        assert_eq!(mask_pull(&credentials), "acme+ci / r*********n");
    }
}
