//! Token Account Rent Reclaimer
//!
//! # WARNING
//! - Closing an account is irreversible. Only empty accounts are touched, but
//!   review the `--dry-run` output before the first real run.
//! - Every close is a signed transaction and costs a network fee.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use rent_reclaim::cli::commands;
use rent_reclaim::config::Config;

/// Reclaim rent from empty token accounts
#[derive(Parser)]
#[command(name = "rent-reclaim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "reclaim.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List detected wallet providers and their signing protocol
    Providers,

    /// List empty token accounts without closing anything
    Scan {
        /// Wallet provider id (default: the connected one, else the first detected)
        #[arg(long)]
        provider: Option<String>,
    },

    /// Close every empty token account and reclaim its rent
    Run {
        /// Wallet provider id (default: the connected one, else the first detected)
        #[arg(long)]
        provider: Option<String>,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,

        /// Show what would be closed, never sign
        #[arg(long)]
        dry_run: bool,
    },

    /// Show current configuration (secrets masked)
    Config,

    /// Check RPC connectivity and wallet providers
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rent_reclaim=info".parse()?),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    startup_checks(&config);

    let result = match cli.command {
        Commands::Providers => commands::providers(&config).await,
        Commands::Scan { provider } => commands::scan(&config, provider.as_deref()).await,
        Commands::Run {
            provider,
            force,
            dry_run,
        } => commands::run(&config, provider.as_deref(), force, dry_run).await,
        Commands::Config => commands::show_config(&config),
        Commands::Health => commands::health(&config).await,
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Warn about configuration that makes every run a no-op
fn startup_checks(config: &Config) {
    if config.wallet.providers.is_empty() {
        warn!("No wallet providers configured; add [[wallet.providers]] to the config file");
        return;
    }

    for entry in &config.wallet.providers {
        if !entry.keypair_path.exists() {
            warn!(
                "Keypair for provider {} not found at {}",
                entry.id,
                entry.keypair_path.display()
            );
        }
    }

    info!(
        "{} wallet provider(s) configured, pacing {}ms between closes",
        config.wallet.providers.len(),
        config.reclaim.pacing_delay_ms
    );
}
