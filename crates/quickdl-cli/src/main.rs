mod args;
mod commands;
mod server;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use args::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let filter = match cli.verbose {
        0 => "quickdl=info,quickdl_core=info,tower_http=info",
        1 => "quickdl=debug,quickdl_core=debug,tower_http=debug",
        2 => "quickdl=trace,quickdl_core=trace,tower_http=debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Some(Commands::Serve(options)) => commands::serve::run(&options, config_path).await,
        Some(Commands::Get {
            url,
            media_type,
            quality,
            output,
        }) => commands::get::run(&url, media_type, quality, output, config_path).await,
        Some(Commands::Prune { older_than_hours }) => {
            commands::prune::run(older_than_hours, config_path).await
        }
        Some(Commands::Doctor) => commands::doctor::run(config_path).await,
        Some(Commands::Config) => commands::config::run(config_path).await,
        None => commands::serve::run(&args::ServeOptions::default(), config_path).await,
    }
}
