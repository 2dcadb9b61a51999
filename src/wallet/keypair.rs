//! Local keypair-backed wallet provider
//!
//! Loads a JSON keypair file (the format `solana-keygen` writes) and exposes it
//! as a provider. Depending on configuration it either signs only, or signs and
//! submits through its own RPC connection.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dialoguer::Confirm;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};
use tracing::{debug, info};

use crate::config::{ProviderEntry, SigningMode};
use crate::error::{Error, Result};

use super::provider::{Capabilities, ProviderError, WalletProvider};

/// Wallet provider backed by a local keypair file
pub struct KeypairProvider {
    id: String,
    keypair: Keypair,
    mode: SigningMode,
    approve_connect: bool,
    connected: AtomicBool,
    rpc: Option<Arc<RpcClient>>,
    send_config: RpcSendTransactionConfig,
}

impl KeypairProvider {
    /// Create a provider around an already loaded keypair
    pub fn new(id: impl Into<String>, keypair: Keypair, mode: SigningMode) -> Self {
        Self {
            id: id.into(),
            keypair,
            mode,
            approve_connect: false,
            connected: AtomicBool::new(false),
            rpc: None,
            send_config: RpcSendTransactionConfig::default(),
        }
    }

    /// Load the provider described by a config entry
    ///
    /// `rpc` is required for sign-and-send providers.
    pub fn from_entry(
        entry: &ProviderEntry,
        rpc: Option<Arc<RpcClient>>,
        send_config: RpcSendTransactionConfig,
    ) -> Result<Self> {
        let keypair = load_keypair(&entry.keypair_path)?;

        if entry.protocol == SigningMode::SignAndSend && rpc.is_none() {
            return Err(Error::Config(format!(
                "Wallet provider {} submits transactions but has no RPC client",
                entry.id
            )));
        }

        let mut provider = Self::new(entry.id.clone(), keypair, entry.protocol);
        provider.approve_connect = entry.approve_connect;
        provider.rpc = rpc;
        provider.send_config = send_config;

        debug!(
            "Loaded wallet provider {} ({})",
            provider.id,
            provider.keypair.pubkey()
        );
        Ok(provider)
    }

    fn sign(&self, mut transaction: Transaction) -> std::result::Result<Transaction, ProviderError> {
        if !self.is_connected() {
            return Err(ProviderError::Rejected(format!("{} is not connected", self.id)));
        }

        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_sign(&[&self.keypair], blockhash)
            .map_err(|e| ProviderError::Failed(e.to_string()))?;

        Ok(transaction)
    }
}

#[async_trait]
impl WalletProvider for KeypairProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            connect: true,
            disconnect: true,
            sign_transaction: self.mode == SigningMode::SignOnly,
            sign_and_send_transaction: self.mode == SigningMode::SignAndSend,
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn public_key(&self) -> Option<Pubkey> {
        self.is_connected().then(|| self.keypair.pubkey())
    }

    async fn connect(&self) -> std::result::Result<Option<Pubkey>, ProviderError> {
        if self.approve_connect {
            let prompt = format!("Connect wallet {} ({})?", self.id, self.keypair.pubkey());
            let approved = tokio::task::spawn_blocking(move || {
                Confirm::new().with_prompt(prompt).default(false).interact()
            })
            .await
            .map_err(|e| ProviderError::Failed(e.to_string()))?
            .map_err(|e| ProviderError::Failed(e.to_string()))?;

            if !approved {
                return Err(ProviderError::Rejected("user declined connection".into()));
            }
        }

        self.connected.store(true, Ordering::SeqCst);
        info!("Wallet {} connected", self.id);
        Ok(Some(self.keypair.pubkey()))
    }

    async fn disconnect(&self) -> std::result::Result<(), ProviderError> {
        if self.connected.swap(false, Ordering::SeqCst) {
            debug!("Wallet {} disconnected", self.id);
        }
        Ok(())
    }

    async fn sign_transaction(
        &self,
        transaction: Transaction,
    ) -> std::result::Result<Transaction, ProviderError> {
        if self.mode != SigningMode::SignOnly {
            return Err(ProviderError::Unsupported("sign_transaction"));
        }
        self.sign(transaction)
    }

    async fn sign_and_send_transaction(
        &self,
        transaction: Transaction,
    ) -> std::result::Result<Signature, ProviderError> {
        if self.mode != SigningMode::SignAndSend {
            return Err(ProviderError::Unsupported("sign_and_send_transaction"));
        }
        let rpc = self
            .rpc
            .as_ref()
            .ok_or(ProviderError::Unsupported("sign_and_send_transaction"))?;

        let signed = self.sign(transaction)?;
        rpc.send_transaction_with_config(&signed, self.send_config)
            .await
            .map_err(|e| ProviderError::Failed(e.to_string()))
    }
}

/// Load a JSON keypair file, refusing group/world readable files on Unix
pub fn load_keypair(path: &Path) -> Result<Keypair> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = std::fs::metadata(path) {
            let mode = metadata.permissions().mode();
            if mode & 0o077 != 0 {
                return Err(Error::InsecureKeypair(format!(
                    "Keypair {} has insecure permissions {:o}. Run 'chmod 600 {}'",
                    path.display(),
                    mode & 0o777,
                    path.display()
                )));
            }
        }
    }

    let keypair_bytes = std::fs::read(path).map_err(|e| {
        Error::InvalidKeypair(format!("Failed to read keypair {}: {}", path.display(), e))
    })?;

    let keypair_json: Vec<u8> = serde_json::from_slice(&keypair_bytes).map_err(|e| {
        Error::InvalidKeypair(format!(
            "Failed to parse keypair JSON {}: {}",
            path.display(),
            e
        ))
    })?;

    Keypair::from_bytes(&keypair_json).map_err(|e| {
        Error::InvalidKeypair(format!("Invalid keypair bytes {}: {}", path.display(), e))
    })
}

#[cfg(test)]
pub(crate) fn write_keypair_file(path: &Path, keypair: &Keypair) {
    let json = serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap();
    std::fs::write(path, json).unwrap();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).unwrap();
    }
}
