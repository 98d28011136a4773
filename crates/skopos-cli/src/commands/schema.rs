//! Schema command implementation.

use anyhow::Result;
use clap::Args;

use skopos_registry::{FieldKind, ProviderKind, Schema};

use super::OutputFormat;

/// Arguments for the schema command.
#[derive(Args)]
pub struct SchemaArgs {
    /// Registry kind (custom, hub, ecr, gcr, ghcr, lscr, gitlab, quay)
    pub kind: ProviderKind,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Runs the schema command.
pub fn run(args: &SchemaArgs) -> Result<()> {
    let schema = args.kind.schema();
    match args.format {
        OutputFormat::Text => print!("{}", render_text(args.kind, &schema)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&schema)?),
    }
    Ok(())
}

fn render_text(kind: ProviderKind, schema: &Schema) -> String {
    let mut out = format!("Registry kind: {kind}\n");
    if schema.allows_empty() {
        out.push_str("Anonymous form: \"\"\n");
    }
    out.push('\n');

    for field in schema.fields() {
        let kind = match field.kind {
            FieldKind::String => "string",
            FieldKind::Uri => "uri",
            FieldKind::Bool => "bool",
        };
        let mut flags = vec![if field.required { "required" } else { "optional" }];
        if field.secret {
            flags.push("secret");
        }
        out.push_str(&format!("  {:<16} {:<7} {}", field.name, kind, flags.join(", ")));
        if let Some(default) = &field.default {
            out.push_str(&format!(" (default: {default})"));
        }
        out.push('\n');
    }
    out
}
