//! Per-account results of a reclaim run

use solana_sdk::{pubkey::Pubkey, signature::Signature};
use thiserror::Error;

use crate::error::Error;

/// Why closing one account failed
///
/// These never abort a run; each is recorded against its own account.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReclaimFailure {
    #[error("transaction build failed: {0}")]
    Build(String),

    #[error("blockhash fetch failed: {0}")]
    BlockhashFetch(String),

    #[error("signing rejected: {0}")]
    SigningRejected(String),

    #[error("broadcast failed: {0}")]
    Broadcast(String),

    #[error("confirmation failed: {0}")]
    ConfirmationTimeout(String),

    #[error("transaction failed on-chain: {0}")]
    TransactionFailed(String),

    #[error("wallet {0} can neither sign nor sign-and-send")]
    UnsupportedSigningProtocol(String),
}

impl ReclaimFailure {
    /// Classify an error raised while awaiting confirmation
    pub fn from_confirmation(error: Error) -> Self {
        match error {
            Error::TransactionFailed(reason) => ReclaimFailure::TransactionFailed(reason),
            other => ReclaimFailure::ConfirmationTimeout(other.to_string()),
        }
    }
}

/// Result of one close attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    Succeeded(Signature),
    Failed(ReclaimFailure),
}

impl TransactionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransactionOutcome::Succeeded(_))
    }

    pub fn signature(&self) -> Option<&Signature> {
        match self {
            TransactionOutcome::Succeeded(signature) => Some(signature),
            TransactionOutcome::Failed(_) => None,
        }
    }
}

/// Outcome tied to the account it was produced for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateOutcome {
    pub account: Pubkey,
    pub mint: Option<Pubkey>,
    /// Rent held by the account when it was scanned
    pub lamports: u64,
    pub outcome: TransactionOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_classification() {
        assert_eq!(
            ReclaimFailure::from_confirmation(Error::TransactionFailed("custom program error: 0xb".into())),
            ReclaimFailure::TransactionFailed("custom program error: 0xb".into())
        );
        assert!(matches!(
            ReclaimFailure::from_confirmation(Error::RpcTimeout(60000)),
            ReclaimFailure::ConfirmationTimeout(_)
        ));
        assert!(matches!(
            ReclaimFailure::from_confirmation(Error::Rpc("connection reset".into())),
            ReclaimFailure::ConfirmationTimeout(_)
        ));
    }

    #[test]
    fn test_outcome_accessors() {
        let signature = Signature::new_unique();
        let ok = TransactionOutcome::Succeeded(signature);
        assert!(ok.is_success());
        assert_eq!(ok.signature(), Some(&signature));

        let failed = TransactionOutcome::Failed(ReclaimFailure::Broadcast("429".into()));
        assert!(!failed.is_success());
        assert!(failed.signature().is_none());
    }
}
