//! One reclaim run from a clean session to a summary

use chrono::{DateTime, Utc};
use solana_sdk::pubkey::Pubkey;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::Result;
use crate::wallet::{ProviderHandle, WalletSessionManager};

use super::orchestrator::ReclaimOrchestrator;
use super::outcome::CandidateOutcome;
use super::report::{lamports_to_sol, OutcomeSink};
use super::scanner::AccountScanner;

/// What a finished run did
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub owner: Pubkey,
    pub provider_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Token accounts the scan returned, eligible or not
    pub scanned: usize,
    pub outcomes: Vec<CandidateOutcome>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Rent returned by the accounts that were actually closed
    pub fn reclaimed_lamports(&self) -> u64 {
        self.outcomes
            .iter()
            .filter(|o| o.outcome.is_success())
            .map(|o| o.lamports)
            .sum()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Run a full reclaim with `provider`
///
/// Every provider is torn down first so the run starts from a clean slate. A
/// connection or scan failure aborts the run with a single abort line; after
/// that point per-account failures never do, and a completion line is always
/// emitted.
pub async fn reclaim_rent(
    sessions: &WalletSessionManager,
    provider: ProviderHandle,
    scanner: &AccountScanner,
    orchestrator: &ReclaimOrchestrator,
    sink: &dyn OutcomeSink,
) -> Result<RunSummary> {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    info!("Starting reclaim run {} with wallet {}", run_id, provider.id());

    let result = execute(sessions, provider, scanner, orchestrator, sink, run_id, started_at).await;

    match result {
        Ok(summary) => {
            sink.emit(&format!(
                "Rent reclaim complete: {} closed, {} failed, {} SOL reclaimed",
                summary.succeeded(),
                summary.failed(),
                lamports_to_sol(summary.reclaimed_lamports())
            ));
            info!(
                "Run {} finished in {}ms",
                run_id,
                summary.duration().num_milliseconds()
            );
            Ok(summary)
        }
        Err(e) => {
            error!("Run {} aborted: {}", run_id, e);
            sink.emit(&format!("Rent reclaim aborted: {}", e));
            Err(e)
        }
    }
}

async fn execute(
    sessions: &WalletSessionManager,
    provider: ProviderHandle,
    scanner: &AccountScanner,
    orchestrator: &ReclaimOrchestrator,
    sink: &dyn OutcomeSink,
    run_id: Uuid,
    started_at: DateTime<Utc>,
) -> Result<RunSummary> {
    sessions.disconnect_all().await;
    let session = sessions.connect(provider).await?;
    let owner = session.address();

    sink.emit(&format!("Starting rent reclaim scan for {}...", owner));
    let candidates = scanner.scan(&owner).await?;
    let scanned = candidates.scanned();

    let outcomes = if candidates.is_empty() {
        sink.emit("No empty token accounts found. Nothing to reclaim.");
        Vec::new()
    } else {
        sink.emit(&format!(
            "Found {} empty token accounts. Closing...",
            candidates.len()
        ));
        orchestrator.run(candidates, &session, sink).await
    };

    Ok(RunSummary {
        run_id,
        owner,
        provider_id: session.provider_id().to_string(),
        started_at,
        finished_at: Utc::now(),
        scanned,
        outcomes,
    })
}
