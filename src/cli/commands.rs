//! CLI command implementations

use anyhow::{Context, Result};
use dialoguer::Confirm;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::signer::Signer;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::Config;
use crate::ledger::RpcLedger;
use crate::reclaim::{
    lamports_to_sol, reclaim_rent, AccountScanner, ConsoleSink, ReclaimOrchestrator,
    TransactionOutcome,
};
use crate::wallet::{
    load_keypair, reports_connected, ConfiguredProviders, ProviderHandle, WalletSessionManager,
};

/// Everything a command needs to talk to the chain and the wallets
struct Services {
    client: Arc<RpcClient>,
    ledger: Arc<RpcLedger>,
    sessions: WalletSessionManager,
}

impl Services {
    fn new(config: &Config) -> Self {
        let commitment = config.rpc.commitment_config();
        let client = Arc::new(RpcClient::new_with_timeout_and_commitment(
            config.rpc.endpoint.clone(),
            config.rpc.timeout(),
            commitment,
        ));

        let send_config = RpcSendTransactionConfig {
            skip_preflight: config.reclaim.skip_preflight,
            preflight_commitment: Some(commitment.commitment),
            ..Default::default()
        };

        let providers = ConfiguredProviders::new(
            config.wallet.providers.clone(),
            client.clone(),
            send_config,
        );

        Self {
            ledger: Arc::new(RpcLedger::new(client.clone(), config)),
            client,
            sessions: WalletSessionManager::new(Arc::new(providers)),
        }
    }

    fn scanner(&self, config: &Config) -> Result<AccountScanner> {
        Ok(AccountScanner::new(
            self.ledger.clone(),
            config.reclaim.token_program_id()?,
        ))
    }

    fn select(&self, provider: Option<&str>) -> Result<ProviderHandle> {
        self.sessions
            .select_provider(provider)
            .context("No usable wallet provider")
    }
}

/// List detected wallet providers
pub async fn providers(config: &Config) -> Result<()> {
    let services = Services::new(config);
    let detected = services.sessions.detect_providers();

    println!("\n=== WALLET PROVIDERS ===\n");
    println!("{:<20} {:<18} {:<10} {}", "ID", "PROTOCOL", "STATE", "ADDRESS");
    println!("{}", "-".repeat(80));

    for provider in &detected {
        let state = if reports_connected(provider.as_ref()) {
            "connected"
        } else {
            "available"
        };
        let address = provider
            .public_key()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<20} {:<18} {:<10} {}",
            provider.id(),
            provider.capabilities().signing_protocol().to_string(),
            state,
            address
        );
    }

    for entry in &config.wallet.providers {
        if !detected.iter().any(|p| p.id() == entry.id) {
            println!(
                "{:<20} {:<18} {:<10} {}",
                entry.id,
                "-",
                "missing",
                entry.keypair_path.display()
            );
        }
    }

    if detected.is_empty() {
        println!("\nNo wallet providers detected.");
    }

    println!();
    Ok(())
}

/// List reclaimable accounts without signing anything
pub async fn scan(config: &Config, provider: Option<&str>) -> Result<()> {
    let services = Services::new(config);
    let provider = services.select(provider)?;
    let scanner = services.scanner(config)?;

    services.sessions.disconnect_all().await;
    let session = services.sessions.connect(provider).await?;
    let owner = session.address();

    info!("Scanning token accounts of {}", owner);
    let candidates = scanner.scan(&owner).await?;

    println!("\n=== EMPTY TOKEN ACCOUNTS ({}) ===\n", owner);
    if candidates.is_empty() {
        println!(
            "No empty token accounts found ({} scanned).",
            candidates.scanned()
        );
    } else {
        println!("{:<46} {:<46} {}", "ACCOUNT", "MINT", "RENT (SOL)");
        println!("{}", "-".repeat(104));
        for account in candidates.iter() {
            println!(
                "{:<46} {:<46} {:.9}",
                account.account_address.to_string(),
                account
                    .mint
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                lamports_to_sol(account.lamports)
            );
        }
        println!(
            "\n{} of {} accounts empty, {:.9} SOL reclaimable",
            candidates.len(),
            candidates.scanned(),
            lamports_to_sol(candidates.total_lamports())
        );
    }

    services.sessions.disconnect().await;
    println!();
    Ok(())
}

/// Close every empty token account of the selected wallet
pub async fn run(config: &Config, provider: Option<&str>, force: bool, dry_run: bool) -> Result<()> {
    if dry_run {
        println!("\n=== DRY RUN ===");
        println!("Nothing will be signed or sent.");
        return scan(config, provider).await;
    }

    let services = Services::new(config);
    let provider = services.select(provider)?;
    let scanner = services.scanner(config)?;
    let orchestrator = ReclaimOrchestrator::new(
        services.ledger.clone(),
        config.reclaim.token_program_id()?,
        config.reclaim.pacing_delay(),
    );

    if !force && config.reclaim.require_confirmation {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Close every empty token account of wallet '{}'? This cannot be undone.",
                provider.id()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            info!("Reclaim cancelled by user");
            return Ok(());
        }
    }

    let summary = reclaim_rent(
        &services.sessions,
        provider,
        &scanner,
        &orchestrator,
        &ConsoleSink,
    )
    .await?;

    services.sessions.disconnect().await;

    println!("\n=== RECLAIM SUMMARY ===");
    println!("Run: {}", summary.run_id);
    println!("Wallet: {} ({})", summary.owner, summary.provider_id);
    println!("Scanned: {}", summary.scanned);
    println!("Closed: {}", summary.succeeded());
    println!("Failed: {}", summary.failed());
    println!(
        "Reclaimed: {:.9} SOL",
        lamports_to_sol(summary.reclaimed_lamports())
    );

    for outcome in &summary.outcomes {
        if let TransactionOutcome::Failed(failure) = &outcome.outcome {
            println!("  {} - {}", outcome.account, failure);
        }
    }

    if summary.failed() > 0 {
        warn!(
            "{} account(s) could not be closed; rerun to retry them",
            summary.failed()
        );
    }

    Ok(())
}

/// Show current configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

/// Check RPC connectivity and every configured keypair
pub async fn health(config: &Config) -> Result<()> {
    println!("\n=== SYSTEM HEALTH CHECK ===\n");

    let mut all_healthy = true;
    let services = Services::new(config);

    print!("RPC Endpoint... ");
    match check_rpc(&services.client).await {
        Ok(latency) => println!("OK ({}ms)", latency),
        Err(e) => {
            println!("FAILED: {}", e);
            all_healthy = false;
        }
    }

    if config.wallet.providers.is_empty() {
        println!("Wallet providers... NONE CONFIGURED");
        all_healthy = false;
    }

    for entry in &config.wallet.providers {
        print!("Wallet {}... ", entry.id);
        match load_keypair(&entry.keypair_path) {
            Ok(keypair) => {
                match services.client.get_balance(&keypair.pubkey()).await {
                    Ok(lamports) => println!(
                        "OK ({}, balance: {} SOL)",
                        keypair.pubkey(),
                        lamports_to_sol(lamports)
                    ),
                    Err(e) => println!("OK ({}, balance unavailable: {})", keypair.pubkey(), e),
                }
            }
            Err(e) => {
                println!("FAILED: {}", e);
                all_healthy = false;
            }
        }
    }

    println!();
    if all_healthy {
        println!("All systems healthy!");
    } else {
        println!("Some systems are unhealthy. Check the errors above.");
    }

    Ok(())
}

async fn check_rpc(client: &RpcClient) -> Result<u64> {
    let start = Instant::now();
    client.get_slot().await?;
    Ok(start.elapsed().as_millis() as u64)
}
