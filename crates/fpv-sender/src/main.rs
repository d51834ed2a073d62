mod app;
mod camera;
mod cli;
mod encoder;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_target(true)
        .init();

    match app::run(cli).await {
        Ok(()) => Ok(()),
        Err(err) => {
            error!("fatal error: {:#}", err);
            Err(err)
        }
    }
}
