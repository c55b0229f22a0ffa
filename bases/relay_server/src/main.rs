// bases/relay_server/src/main.rs
use clap::Parser;
use color_eyre::Result;

mod config;
mod error;
mod server;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_server=info,media_relay=info,tower_http=info".into()),
        )
        .init();

    // Parse CLI arguments
    let args = config::CliArgs::parse();
    let config = config::Config::from_args(args);

    tracing::info!("Starting video relay on {}", config.bind_addr());

    server::run(config).await?;

    Ok(())
}
