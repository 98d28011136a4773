//! Registries command implementation.

use anyhow::Result;
use clap::Args;
use serde_json::Value;
use tracing::info;

use skopos_registry::ProviderDescriptor;

use super::{GlobalArgs, OutputFormat};

/// Arguments for the registries command.
#[derive(Args)]
pub struct RegistriesArgs {
    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Runs the registries command.
pub fn run(global: &GlobalArgs, args: &RegistriesArgs) -> Result<()> {
    let resolver = global.resolver()?;
    let descriptors = resolver.descriptors();
    info!(count = descriptors.len(), "Listing registries");

    match args.format {
        OutputFormat::Text => print!("{}", render_text(&descriptors)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&descriptors)?),
    }
    Ok(())
}

fn render_text(descriptors: &[ProviderDescriptor]) -> String {
    let mut out = String::from("Registries (in match order)\n===========================\n\n");
    for descriptor in descriptors {
        out.push_str(&format!("● {}\n", descriptor.id));
        if descriptor.configuration.is_empty() {
            out.push_str("    (anonymous)\n");
        }
        for (key, value) in &descriptor.configuration {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            out.push_str(&format!("    {key}: {value}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use skopos_registry::{ProviderContext, RegistrySettings, Resolver};

    #[test]
    fn test_render_text_masks_and_lists_fallback() {
        let settings = RegistrySettings::new().with_entry(
            "gitlab",
            "private",
            json!({ "token": "glpat-abcdef" }),
        );
        let resolver = Resolver::from_settings(&settings, &ProviderContext::default());
        let text = render_text(&resolver.descriptors());

        assert!(text.contains("● gitlab.private"));
        assert!(text.contains("token: g**********f"));
        assert!(!text.contains("glpat-abcdef"));
        assert!(text.contains("● hub.public\n    (anonymous)"));
        assert!(text.trim_end().ends_with("(anonymous)"));
        assert!(text.contains("● custom.default"));
    }
}
