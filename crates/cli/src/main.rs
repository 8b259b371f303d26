//! Wallet connector CLI.
//!
//! Developer tooling around the connector crates: render verification
//! fingerprints and run the full connect/onboard/submit flow against the
//! in-process dev backends.

mod commands;
mod dev;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Wallet connector developer tooling.
#[derive(Parser, Debug)]
#[command(name = "wallet-connect")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render the verification fingerprint for a shared-secret hash.
    Fingerprint {
        /// Hex-encoded 32-byte hash.
        hash: String,
    },

    /// Run the demo flow: discover, handshake, onboard and submit one
    /// transaction against in-process dev backends.
    Demo {
        /// Start with an empty account so onboarding takes the drip detour.
        #[arg(long)]
        zero_balance: bool,

        /// Drip secret phrase to claim the faucet with.
        #[arg(short, long)]
        secret: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Commands::Fingerprint { hash } => {
            commands::show_fingerprint(&hash)?;
        }
        Commands::Demo {
            zero_balance,
            secret,
        } => {
            commands::run_demo(zero_balance, secret).await?;
        }
    }

    Ok(())
}
