//! JSON-RPC ledger implementation

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use solana_account_decoder::UiAccountData;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::{RpcRequest, TokenAccountsFilter};
use solana_client::rpc_response::RpcKeyedAccount;
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};

use super::{Ledger, RawBalance, TokenAccountRecord};

/// Ledger backed by a Solana JSON-RPC endpoint
pub struct RpcLedger {
    client: Arc<RpcClient>,
    commitment: CommitmentConfig,
    skip_preflight: bool,
    confirm_timeout: Duration,
    poll_interval: Duration,
}

impl RpcLedger {
    pub fn new(client: Arc<RpcClient>, config: &Config) -> Self {
        Self {
            client,
            commitment: config.rpc.commitment_config(),
            skip_preflight: config.reclaim.skip_preflight,
            confirm_timeout: config.reclaim.confirm_timeout(),
            poll_interval: config.reclaim.confirm_poll_interval(),
        }
    }

    async fn poll_signature(&self, signature: &Signature) -> Result<()> {
        loop {
            match self
                .client
                .get_signature_status_with_commitment(signature, self.commitment)
                .await?
            {
                Some(Ok(())) => return Ok(()),
                Some(Err(e)) => return Err(Error::TransactionFailed(e.to_string())),
                None => tokio::time::sleep(self.poll_interval).await,
            }
        }
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        program_id: &Pubkey,
    ) -> Result<Vec<TokenAccountRecord>> {
        let accounts = self
            .client
            .get_token_accounts_by_owner(owner, TokenAccountsFilter::ProgramId(*program_id))
            .await?;

        debug!("Fetched {} token accounts for {}", accounts.len(), owner);

        accounts
            .into_iter()
            .map(|keyed| parse_keyed_account(keyed, owner))
            .collect()
    }

    async fn latest_blockhash(&self) -> Result<Hash> {
        let (blockhash, _last_valid_height) = self
            .client
            .get_latest_blockhash_with_commitment(self.commitment)
            .await?;
        Ok(blockhash)
    }

    async fn broadcast_raw_transaction(&self, bytes: &[u8]) -> Result<Signature> {
        let params = json!([
            BASE64.encode(bytes),
            {
                "encoding": "base64",
                "skipPreflight": self.skip_preflight,
                "preflightCommitment": self.commitment.commitment,
            }
        ]);

        let signature: String = self
            .client
            .send(RpcRequest::SendTransaction, params)
            .await
            .map_err(|e| Error::TransactionSend(e.to_string()))?;

        Signature::from_str(&signature)
            .map_err(|e| Error::Deserialization(format!("Invalid signature {}: {}", signature, e)))
    }

    async fn await_confirmation(&self, signature: &Signature) -> Result<()> {
        match tokio::time::timeout(self.confirm_timeout, self.poll_signature(signature)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Confirmation of {} timed out", signature);
                Err(Error::RpcTimeout(self.confirm_timeout.as_millis() as u64))
            }
        }
    }
}

/// Convert a jsonParsed keyed account into a record
///
/// Accounts that did not come back as parsed JSON keep a `Missing` balance,
/// which keeps them out of the eligible set.
fn parse_keyed_account(keyed: RpcKeyedAccount, queried_owner: &Pubkey) -> Result<TokenAccountRecord> {
    let address = Pubkey::from_str(&keyed.pubkey)
        .map_err(|e| Error::Deserialization(format!("Invalid account {}: {}", keyed.pubkey, e)))?;

    let info = match &keyed.account.data {
        UiAccountData::Json(parsed) => parsed.parsed.get("info").cloned(),
        _ => None,
    };

    let owner = info
        .as_ref()
        .and_then(|i| i.get("owner"))
        .and_then(Value::as_str)
        .map(Pubkey::from_str)
        .transpose()
        .map_err(|e| Error::Deserialization(format!("Invalid owner for {}: {}", address, e)))?
        .unwrap_or(*queried_owner);

    let mint = info
        .as_ref()
        .and_then(|i| i.get("mint"))
        .and_then(Value::as_str)
        .and_then(|m| Pubkey::from_str(m).ok());

    Ok(TokenAccountRecord {
        address,
        owner,
        mint,
        lamports: keyed.account.lamports,
        balance: token_balance(info.as_ref().and_then(|i| i.get("tokenAmount"))),
    })
}

/// `uiAmount`, falling back to `uiAmountString` when the number is null
fn token_balance(token_amount: Option<&Value>) -> RawBalance {
    let Some(amount) = token_amount else {
        return RawBalance::Missing;
    };

    match amount.get("uiAmount") {
        Some(value) if !value.is_null() => RawBalance::from_json(Some(value)),
        _ => RawBalance::from_json(amount.get("uiAmountString")),
    }
}
