//! Wallet provider capability surface
//!
//! Providers are external signers. Not every provider exposes every capability:
//! some can only sign, some can only sign-and-submit, some cannot disconnect.
//! The capability set is read once when a session is opened and collapsed into
//! a [`SigningProtocol`] tag that the reclaim pipeline branches on.

use async_trait::async_trait;
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::Transaction};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by a wallet provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// User declined the request
    #[error("request rejected: {0}")]
    Rejected(String),

    /// Provider does not implement this capability
    #[error("capability not supported: {0}")]
    Unsupported(&'static str),

    /// Provider failed internally
    #[error("provider error: {0}")]
    Failed(String),
}

/// Capabilities a provider exposes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub connect: bool,
    pub disconnect: bool,
    pub sign_transaction: bool,
    pub sign_and_send_transaction: bool,
}

impl Capabilities {
    /// Pick the signing protocol, preferring sign-only
    pub fn signing_protocol(&self) -> SigningProtocol {
        if self.sign_transaction {
            SigningProtocol::SignOnly
        } else if self.sign_and_send_transaction {
            SigningProtocol::SignAndSubmit
        } else {
            SigningProtocol::Unsupported
        }
    }
}

/// Signing protocol negotiated at connect time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningProtocol {
    /// Provider signs, we broadcast the raw bytes
    SignOnly,
    /// Provider signs and submits, handing back a signature
    SignAndSubmit,
    /// Provider can do neither
    Unsupported,
}

impl fmt::Display for SigningProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningProtocol::SignOnly => write!(f, "sign-only"),
            SigningProtocol::SignAndSubmit => write!(f, "sign-and-submit"),
            SigningProtocol::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// Shared handle to a provider
pub type ProviderHandle = Arc<dyn WalletProvider>;

/// A wallet provider
///
/// Capability methods a provider does not expose keep their default
/// implementation, which reports [`ProviderError::Unsupported`].
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Stable id per provider kind
    fn id(&self) -> &str;

    /// Capabilities this provider exposes
    fn capabilities(&self) -> Capabilities;

    /// Provider-reported connection flag
    fn is_connected(&self) -> bool;

    /// Public key, present only once connected
    fn public_key(&self) -> Option<Pubkey>;

    /// Request a connection; resolves with the address the provider handed out
    async fn connect(&self) -> Result<Option<Pubkey>, ProviderError> {
        Err(ProviderError::Unsupported("connect"))
    }

    /// Best-effort teardown
    async fn disconnect(&self) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported("disconnect"))
    }

    /// Sign a transaction and hand it back
    async fn sign_transaction(&self, _transaction: Transaction) -> Result<Transaction, ProviderError> {
        Err(ProviderError::Unsupported("sign_transaction"))
    }

    /// Sign and submit a transaction, returning its signature
    async fn sign_and_send_transaction(
        &self,
        _transaction: Transaction,
    ) -> Result<Signature, ProviderError> {
        Err(ProviderError::Unsupported("sign_and_send_transaction"))
    }
}

/// Whether a provider believes itself connected
pub fn reports_connected(provider: &dyn WalletProvider) -> bool {
    provider.is_connected() || provider.public_key().is_some()
}
