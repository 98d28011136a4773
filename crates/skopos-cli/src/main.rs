//! Skopos CLI - inspect registry configuration, resolution and authentication.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.global.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Registries(args) => commands::registries::run(&cli.global, &args),
        Commands::Resolve(args) => commands::resolve::run(&cli.global, &args),
        Commands::Auth(args) => commands::auth::run(&cli.global, &args).await,
        Commands::Schema(args) => commands::schema::run(&args),
        Commands::Version => {
            println!("skopos {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
