use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::{debug, info};

use flightcast::advisory::{
    capability, AdvisoryBoundary, AdvisoryMode, AdvisoryOrchestrator, AdvisoryRequest,
    CascadeResolver, HttpBoundary, InProcessBoundary, LocalInference, OllamaInference,
};
use flightcast::config::FlightcastConfig;
use flightcast::context::{parse_hhmm, FlightContext, FlightInfo};

#[derive(Parser)]
#[command(name = "flightcast")]
#[command(version)]
#[command(about = "Generate travel advisories for a flight")]
struct Cli {
    /// TOML config file
    #[arg(long, global = true, env = "FLIGHTCAST_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Produce an advisory (advice, translate or rewrite)
    Advise(AdviseArgs),
    /// Print the remote candidates the current config would try
    Candidates,
    /// Print the local inference capability status
    Probe(LocalArgs),
}

#[derive(Args)]
struct LocalArgs {
    /// Try local inference first
    #[arg(long)]
    local: bool,
}

#[derive(Args)]
struct AdviseArgs {
    #[arg(long, default_value = "advice")]
    mode: AdvisoryMode,

    /// Target language for translate
    #[arg(long, default_value = "en")]
    language: String,

    /// Advisory text to translate or rewrite
    #[arg(long, conflicts_with = "prior_file")]
    prior_text: Option<String>,

    #[arg(long)]
    prior_file: Option<PathBuf>,

    /// JSON file holding the full flight context
    #[arg(long, conflicts_with_all = ["airline", "origin", "destination"])]
    context_file: Option<PathBuf>,

    #[arg(long)]
    airline: Option<String>,

    #[arg(long)]
    origin: Option<String>,

    #[arg(long)]
    destination: Option<String>,

    /// Flight date, YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Scheduled departure, HHMM
    #[arg(long, value_parser = parse_hhmm)]
    departure: Option<u16>,

    /// Delegate to a running gateway instead of resolving in process
    #[arg(long, env = "FLIGHTCAST_GATEWAY_URL")]
    gateway: Option<String>,

    #[command(flatten)]
    local: LocalArgs,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("flightcast=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = FlightcastConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Advise(args) => advise(&config, args).await,
        Commands::Candidates => {
            let resolver = CascadeResolver::from_config(&config.remote)?;
            for (i, candidate) in resolver.candidates().iter().enumerate() {
                println!("{:>2}. {}", i + 1, candidate);
            }
            if !resolver.is_configured() {
                eprintln!("(no remote credential configured; the stub would answer)");
            }
            Ok(())
        }
        Commands::Probe(args) => {
            let local = local_facility(&config, args.local)?;
            let status = capability::probe(local.as_deref()).await;
            println!("{}", status);
            Ok(())
        }
    }
}

async fn advise(config: &FlightcastConfig, args: AdviseArgs) -> anyhow::Result<()> {
    let prior_text = match (&args.prior_text, &args.prior_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        (None, None) => String::new(),
    };

    let request = AdvisoryRequest {
        mode: args.mode,
        language: args.language.clone(),
        prior_text,
        context: build_context(&args)?,
    };
    request.validate()?;

    let gateway_url = args.gateway.as_deref().or(config.gateway.url.as_deref());
    let boundary: Arc<dyn AdvisoryBoundary> = match gateway_url {
        Some(url) => {
            debug!(%url, "Delegating advisories to gateway");
            Arc::new(HttpBoundary::new(
                url,
                Duration::from_secs(config.gateway.request_timeout_seconds),
            )?)
        }
        None => {
            let resolver = CascadeResolver::from_config(&config.remote)?;
            debug!(configured = resolver.is_configured(), "Resolving advisories in process");
            Arc::new(InProcessBoundary::new(Arc::new(resolver)))
        }
    };

    let local = local_facility(config, args.local.local)?;
    let orchestrator = AdvisoryOrchestrator::initialize(local, boundary).await;
    let result = orchestrator.generate(request).await;
    info!(
        provider = %result.provider,
        capability = %orchestrator.capability(),
        "Advisory ready"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.text);
        eprintln!();
        eprintln!("provider: {}", result.provider);
        if let Some(info) = &result.error_info {
            eprintln!("note: {}", info);
        }
    }
    Ok(())
}

fn local_facility(
    config: &FlightcastConfig,
    force: bool,
) -> anyhow::Result<Option<Arc<dyn LocalInference>>> {
    if !(force || config.local.enabled) {
        return Ok(None);
    }
    let facility = OllamaInference::new(&config.local)?;
    Ok(Some(Arc::new(facility)))
}

fn build_context(args: &AdviseArgs) -> anyhow::Result<Value> {
    if let Some(path) = &args.context_file {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let value: Value = serde_json::from_str(&raw)
            .with_context(|| format!("parsing {}", path.display()))?;
        // Typed snapshots get the derived summary; anything else passes through.
        return Ok(match serde_json::from_value::<FlightContext>(value.clone()) {
            Ok(context) => context.to_value(),
            Err(_) => value,
        });
    }

    match (&args.origin, &args.destination) {
        (Some(origin), Some(destination)) => {
            let flight = FlightInfo {
                airline: args.airline.clone().unwrap_or_default(),
                origin: origin.to_uppercase(),
                destination: destination.to_uppercase(),
                date: args
                    .date
                    .unwrap_or_else(|| chrono::Local::now().date_naive()),
                scheduled_departure: args.departure,
            };
            Ok(FlightContext::new(flight).to_value())
        }
        (None, None) => Ok(Value::Null),
        _ => bail!("--origin and --destination must be given together"),
    }
}
