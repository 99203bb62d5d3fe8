//! Autolock entry point.

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use autolock_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => autolock_cli::run::execute(&cli.config).await?,
        Commands::Servo { pin, angle } => autolock_cli::servo::execute(&cli.config, pin, angle).await?,
        Commands::Register { card, timeout_ms } => {
            autolock_cli::register::execute(&cli.config, card.as_deref(), timeout_ms).await?
        }
    }

    Ok(())
}
