use authorizer::{AuthorizationSigner, EndpointSelector};
use clap::{Parser, Subcommand};
use configuration::load_settings;
use core_types::{Address, ControllerId, CycleStep};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// The main entry point for the Custodia operations CLI.
#[tokio::main]
async fn main() {
    // Load environment variables (the signer secret lives there) from .env.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Parse command-line arguments
    let cli = Cli::parse();

    // Execute the appropriate command
    match cli.command {
        Commands::Probe(args) => {
            if let Err(e) = handle_probe(args).await {
                eprintln!("Error during probe: {e}");
                std::process::exit(1);
            }
        }
        Commands::Sign(args) => {
            if let Err(e) = handle_sign(args).await {
                eprintln!("Error during sign: {e}");
                std::process::exit(1);
            }
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Operations tooling for the custodial fund core.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe a network's execution endpoints and report the selected one.
    Probe(ProbeArgs),
    /// Authorize a rollover batch described in a JSON proposal file.
    Sign(SignArgs),
}

#[derive(Parser)]
struct ProbeArgs {
    /// The network to probe (a key under [endpoints.networks] in custodia.toml).
    #[arg(long)]
    network: String,
}

#[derive(Parser)]
struct SignArgs {
    /// The network the batch will be submitted on.
    #[arg(long)]
    network: String,

    /// Path to the JSON proposal file.
    #[arg(long)]
    file: PathBuf,
}

/// The on-disk shape of a batch proposal.
#[derive(Deserialize)]
struct ProposalFile {
    token: Address,
    amount: Decimal,
    steps: Vec<ProposalStep>,
}

#[derive(Deserialize)]
struct ProposalStep {
    /// Either a 32-byte hex id or a short label ("pancake-swap").
    controller: String,
    /// Hex-encoded adapter payload.
    payload: String,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let settings = load_settings()?;
    let selector = EndpointSelector::new(&settings.endpoints);

    let candidate = selector.select(&args.network).await?;
    println!(
        "Selected endpoint for {}: {} (height {}, latency {:?})",
        args.network, candidate.url, candidate.height, candidate.latency
    );
    Ok(())
}

async fn handle_sign(args: SignArgs) -> anyhow::Result<()> {
    let settings = load_settings()?;
    let selector = Arc::new(EndpointSelector::new(&settings.endpoints));
    let signer = AuthorizationSigner::new(settings.signer.secret.clone(), selector);

    let raw = std::fs::read_to_string(&args.file)?;
    let proposal: ProposalFile = serde_json::from_str(&raw)?;
    let steps = proposal
        .steps
        .into_iter()
        .map(parse_step)
        .collect::<anyhow::Result<Vec<_>>>()?;

    let authorization = signer
        .authorize(&args.network, &proposal.token, &proposal.amount, &steps)
        .await?;

    println!("{}", serde_json::to_string_pretty(&authorization)?);
    Ok(())
}

fn parse_step(step: ProposalStep) -> anyhow::Result<CycleStep> {
    // Accept a raw 32-byte hex id, falling back to label padding.
    let controller_id = step
        .controller
        .parse::<ControllerId>()
        .or_else(|_| ControllerId::from_label(&step.controller))?;
    let payload = hex::decode(step.payload.strip_prefix("0x").unwrap_or(&step.payload))?;
    Ok(CycleStep::new(controller_id, payload))
}
