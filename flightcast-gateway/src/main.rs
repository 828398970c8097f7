use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use flightcast::advisory::CascadeResolver;
use flightcast::config::FlightcastConfig;
use flightcast::gateway::AdvisoryGateway;

#[derive(Parser)]
#[command(name = "flightcast-gateway")]
#[command(version)]
#[command(about = "Flightcast advisory gateway")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Serve(ServeArgs),
}

#[derive(Parser)]
struct ServeArgs {
    /// Address to listen on. Overrides `gateway.bind_addr`.
    #[arg(long)]
    bind_addr: Option<String>,

    /// TOML config file
    #[arg(long, env = "FLIGHTCAST_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("flightcast=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => serve(args).await,
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = FlightcastConfig::load(args.config.as_deref()).context("loading configuration")?;
    let bind_addr = args.bind_addr.unwrap_or_else(|| config.gateway.bind_addr.clone());

    let resolver = CascadeResolver::from_config(&config.remote).context("building resolver")?;
    if !resolver.is_configured() {
        info!("No remote credential configured; advisories will use the demo stub");
    }

    AdvisoryGateway::new(Arc::new(resolver))
        .serve(&bind_addr)
        .await
        .context("running gateway")?;
    Ok(())
}
