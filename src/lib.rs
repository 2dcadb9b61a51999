//! Token Account Rent Reclaimer Library
//!
//! Finds empty SPL token accounts owned by a wallet and closes them, returning
//! the rent they hold to the owner.

pub mod cli;
pub mod config;
pub mod error;
pub mod ledger;
pub mod reclaim;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
