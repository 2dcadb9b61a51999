//! Sequential close pipeline
//!
//! Every candidate goes through build, blockhash, sign, submit and confirm on
//! its own. A failure is recorded against that candidate and the batch moves
//! on; nothing here aborts a run.

use std::sync::Arc;
use std::time::Duration;

use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::Transaction};
use tracing::{debug, info, warn};

use crate::ledger::Ledger;
use crate::wallet::{ActiveSession, ProviderError, SigningProtocol};

use super::instruction::{build_close_instruction, unsigned_transaction};
use super::outcome::{CandidateOutcome, ReclaimFailure, TransactionOutcome};
use super::report::OutcomeSink;
use super::scanner::{Candidates, CustodyAccountSnapshot};

/// Closes candidates one at a time through the session's wallet
pub struct ReclaimOrchestrator {
    ledger: Arc<dyn Ledger>,
    program_id: Pubkey,
    pacing: Duration,
}

impl ReclaimOrchestrator {
    pub fn new(ledger: Arc<dyn Ledger>, program_id: Pubkey, pacing: Duration) -> Self {
        Self {
            ledger,
            program_id,
            pacing,
        }
    }

    /// Attempt every candidate in order, returning one outcome per candidate
    pub async fn run(
        &self,
        candidates: Candidates,
        session: &ActiveSession,
        sink: &dyn OutcomeSink,
    ) -> Vec<CandidateOutcome> {
        let total = candidates.len();
        let mut outcomes = Vec::with_capacity(total);

        for (index, candidate) in candidates.into_iter().enumerate() {
            debug!(
                "Closing {} ({}/{}) via {}",
                candidate.account_address,
                index + 1,
                total,
                session.protocol()
            );

            let outcome = match self.close(&candidate, session).await {
                Ok(signature) => {
                    info!("Closed {} ({})", candidate.account_address, signature);
                    sink.emit(&format!(
                        "Closed account {} (tx: {})",
                        candidate.account_address, signature
                    ));
                    TransactionOutcome::Succeeded(signature)
                }
                Err(failure) => {
                    warn!("Failed to close {}: {}", candidate.account_address, failure);
                    sink.emit(&format!(
                        "Failed to close {}: {}",
                        candidate.account_address, failure
                    ));
                    TransactionOutcome::Failed(failure)
                }
            };

            outcomes.push(CandidateOutcome {
                account: candidate.account_address,
                mint: candidate.mint,
                lamports: candidate.lamports,
                outcome,
            });

            if !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
        }

        outcomes
    }

    async fn close(
        &self,
        candidate: &CustodyAccountSnapshot,
        session: &ActiveSession,
    ) -> Result<Signature, ReclaimFailure> {
        let owner = session.address();
        if candidate.owner_address != owner {
            return Err(ReclaimFailure::Build(format!(
                "account owned by {}, session wallet is {}",
                candidate.owner_address, owner
            )));
        }

        let instruction =
            build_close_instruction(&self.program_id, &candidate.account_address, &owner);

        // Never reuse a blockhash across candidates
        let blockhash = self
            .ledger
            .latest_blockhash()
            .await
            .map_err(|e| ReclaimFailure::BlockhashFetch(e.to_string()))?;

        let transaction = unsigned_transaction(instruction, &owner, blockhash);

        let signature = match session.protocol() {
            SigningProtocol::SignOnly => self.sign_and_broadcast(session, transaction).await?,
            SigningProtocol::SignAndSubmit => session
                .provider()
                .sign_and_send_transaction(transaction)
                .await
                .map_err(|e| match e {
                    ProviderError::Rejected(reason) => ReclaimFailure::SigningRejected(reason),
                    other => ReclaimFailure::Broadcast(other.to_string()),
                })?,
            SigningProtocol::Unsupported => {
                return Err(ReclaimFailure::UnsupportedSigningProtocol(
                    session.provider_id().to_string(),
                ))
            }
        };

        self.ledger
            .await_confirmation(&signature)
            .await
            .map_err(ReclaimFailure::from_confirmation)?;

        Ok(signature)
    }

    async fn sign_and_broadcast(
        &self,
        session: &ActiveSession,
        transaction: Transaction,
    ) -> Result<Signature, ReclaimFailure> {
        let signed = session
            .provider()
            .sign_transaction(transaction)
            .await
            .map_err(|e| ReclaimFailure::SigningRejected(e.to_string()))?;

        let bytes =
            bincode::serialize(&signed).map_err(|e| ReclaimFailure::Build(e.to_string()))?;

        self.ledger
            .broadcast_raw_transaction(&bytes)
            .await
            .map_err(|e| ReclaimFailure::Broadcast(e.to_string()))
    }
}
