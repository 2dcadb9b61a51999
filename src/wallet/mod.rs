//! Wallet provider sessions
//!
//! # Architecture
//!
//! ```text
//! ProviderSource → WalletSessionManager → ActiveSession
//!   (detection)     (exclusive session)    (address + signing protocol)
//! ```
//!
//! At most one provider is active at a time. Opening a session tears down the
//! previous one first, and provider teardown errors never block that.

pub mod keypair;
pub mod provider;
pub mod registry;
pub mod session;

pub use keypair::{load_keypair, KeypairProvider};
pub use provider::{
    reports_connected, Capabilities, ProviderError, ProviderHandle, SigningProtocol,
    WalletProvider,
};
pub use registry::{ConfiguredProviders, ProviderSource};
pub use session::{
    ActiveSession, SessionState, TeardownFailure, TeardownReport, WalletSessionManager,
};
