//! Ledger read/broadcast collaborator
//!
//! The reclaim pipeline only talks to the chain through [`Ledger`]. The RPC
//! implementation lives in [`rpc`]; tests use a scripted ledger.

pub mod rpc;

use async_trait::async_trait;
use serde_json::Value;
use solana_sdk::{hash::Hash, pubkey::Pubkey, signature::Signature};

use crate::error::Result;

pub use rpc::RpcLedger;

/// Balance as reported by the ledger, before any interpretation
#[derive(Debug, Clone, PartialEq)]
pub enum RawBalance {
    Number(f64),
    Text(String),
    Missing,
}

impl RawBalance {
    /// Read a JSON value; anything that is not a number or string is `Missing`
    pub fn from_json(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Number(n)) => n.as_f64().map(RawBalance::Number).unwrap_or(RawBalance::Missing),
            Some(Value::String(s)) => RawBalance::Text(s.clone()),
            _ => RawBalance::Missing,
        }
    }

    /// Numeric balance in UI units; `None` when missing, unparseable or not finite
    pub fn units(&self) -> Option<f64> {
        let units = match self {
            RawBalance::Number(n) => *n,
            RawBalance::Text(s) => s.trim().parse::<f64>().ok()?,
            RawBalance::Missing => return None,
        };
        units.is_finite().then_some(units)
    }

    /// Exactly zero. Unparseable balances are never treated as zero.
    pub fn is_zero(&self) -> bool {
        self.units() == Some(0.0)
    }
}

/// One token account as returned by an owner-scoped query
#[derive(Debug, Clone, PartialEq)]
pub struct TokenAccountRecord {
    pub address: Pubkey,
    pub owner: Pubkey,
    pub mint: Option<Pubkey>,
    /// Lamports held by the account (the rent a close returns)
    pub lamports: u64,
    pub balance: RawBalance,
}

/// Chain access used by the scanner and orchestrator
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Token accounts owned by `owner` under `program_id`
    async fn token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        program_id: &Pubkey,
    ) -> Result<Vec<TokenAccountRecord>>;

    /// A fresh recent blockhash
    async fn latest_blockhash(&self) -> Result<Hash>;

    /// Submit a serialized, signed transaction
    async fn broadcast_raw_transaction(&self, bytes: &[u8]) -> Result<Signature>;

    /// Wait until `signature` settles
    async fn await_confirmation(&self, signature: &Signature) -> Result<()>;
}
