//! Error types for the rent reclaimer

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the rent reclaimer
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid keypair: {0}")]
    InvalidKeypair(String),

    #[error("Insecure keypair permissions: {0}")]
    InsecureKeypair(String),

    // RPC errors
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("RPC timeout after {0}ms")]
    RpcTimeout(u64),

    // Wallet session errors (fatal to a reclaim run)
    #[error("Wallet provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Wallet connection failed: {0}")]
    ConnectionRejected(String),

    #[error("No public key returned from wallet {0}")]
    NoPublicKeyReturned(String),

    // Scan errors (fatal to a reclaim run)
    #[error("Token account scan failed: {0}")]
    ScanFetch(String),

    // Transaction errors
    #[error("Transaction send failed: {0}")]
    TransactionSend(String),

    #[error("Transaction failed on-chain: {0}")]
    TransactionFailed(String),

    // Decoding errors
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl Error {
    /// Check if this error aborts a reclaim run before any transaction is attempted
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(
            self,
            Error::ProviderUnavailable(_)
                | Error::ConnectionRejected(_)
                | Error::NoPublicKeyReturned(_)
                | Error::ScanFetch(_)
        )
    }
}

// Conversion from solana_client errors
impl From<solana_client::client_error::ClientError> for Error {
    fn from(e: solana_client::client_error::ClientError) -> Self {
        Error::Rpc(e.to_string())
    }
}
