//! Eligible account discovery

use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::ledger::{Ledger, RawBalance, TokenAccountRecord};

/// A token account as seen by one scan
#[derive(Debug, Clone, PartialEq)]
pub struct CustodyAccountSnapshot {
    pub account_address: Pubkey,
    pub owner_address: Pubkey,
    pub mint: Option<Pubkey>,
    pub lamports: u64,
    pub balance: RawBalance,
}

impl CustodyAccountSnapshot {
    /// Only accounts holding exactly zero tokens can be closed
    pub fn is_eligible(&self) -> bool {
        self.balance.is_zero()
    }
}

impl From<TokenAccountRecord> for CustodyAccountSnapshot {
    fn from(record: TokenAccountRecord) -> Self {
        Self {
            account_address: record.address,
            owner_address: record.owner,
            mint: record.mint,
            lamports: record.lamports,
            balance: record.balance,
        }
    }
}

/// Eligible accounts from one scan, consumed once by a run
#[derive(Debug)]
pub struct Candidates {
    accounts: Vec<CustodyAccountSnapshot>,
    scanned: usize,
}

impl Candidates {
    pub fn new(accounts: Vec<CustodyAccountSnapshot>, scanned: usize) -> Self {
        Self { accounts, scanned }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Accounts returned by the ledger before filtering
    pub fn scanned(&self) -> usize {
        self.scanned
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CustodyAccountSnapshot> {
        self.accounts.iter()
    }

    /// Rent held by all candidates
    pub fn total_lamports(&self) -> u64 {
        self.accounts.iter().map(|a| a.lamports).sum()
    }
}

impl IntoIterator for Candidates {
    type Item = CustodyAccountSnapshot;
    type IntoIter = std::vec::IntoIter<CustodyAccountSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.accounts.into_iter()
    }
}

/// Finds the empty token accounts of an owner
pub struct AccountScanner {
    ledger: Arc<dyn Ledger>,
    program_id: Pubkey,
}

impl AccountScanner {
    pub fn new(ledger: Arc<dyn Ledger>, program_id: Pubkey) -> Self {
        Self { ledger, program_id }
    }

    /// Fetch the owner's token accounts and keep the empty ones
    ///
    /// Any ledger failure is a [`Error::ScanFetch`]; a partial scan is never
    /// returned.
    pub async fn scan(&self, owner: &Pubkey) -> Result<Candidates> {
        let records = self
            .ledger
            .token_accounts_by_owner(owner, &self.program_id)
            .await
            .map_err(|e| Error::ScanFetch(e.to_string()))?;

        let scanned = records.len();
        let accounts: Vec<CustodyAccountSnapshot> = records
            .into_iter()
            .map(CustodyAccountSnapshot::from)
            .filter(|snapshot| {
                let eligible = snapshot.is_eligible();
                if !eligible {
                    debug!(
                        "Skipping {} (balance {:?})",
                        snapshot.account_address, snapshot.balance
                    );
                }
                eligible
            })
            .collect();

        info!(
            "Scanned {} token accounts for {}, {} empty",
            scanned,
            owner,
            accounts.len()
        );

        Ok(Candidates::new(accounts, scanned))
    }
}
