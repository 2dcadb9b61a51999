//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub rpc: RpcConfig,
    #[serde(default)]
    pub reclaim: ReclaimConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Commitment level used for blockhashes and confirmation
    #[serde(default = "default_commitment")]
    pub commitment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReclaimConfig {
    /// Token program whose accounts are scanned and closed
    #[serde(default = "default_token_program")]
    pub token_program: String,

    /// Pause after every close attempt, success or failure
    #[serde(default = "default_pacing_delay_ms")]
    pub pacing_delay_ms: u64,

    /// How long to wait for a signature to settle
    #[serde(default = "default_confirm_timeout_ms")]
    pub confirm_timeout_ms: u64,

    #[serde(default = "default_confirm_poll_interval_ms")]
    pub confirm_poll_interval_ms: u64,

    /// Skip the node's preflight simulation on broadcast
    #[serde(default)]
    pub skip_preflight: bool,

    /// Ask before signing anything
    #[serde(default = "default_true")]
    pub require_confirmation: bool,
}

impl Default for ReclaimConfig {
    fn default() -> Self {
        Self {
            token_program: default_token_program(),
            pacing_delay_ms: default_pacing_delay_ms(),
            confirm_timeout_ms: default_confirm_timeout_ms(),
            confirm_poll_interval_ms: default_confirm_poll_interval_ms(),
            skip_preflight: false,
            require_confirmation: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletConfig {
    /// Wallet providers available for detection
    #[serde(default)]
    pub providers: Vec<ProviderEntry>,
}

/// One configured wallet provider
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEntry {
    /// Stable provider id: "hot", "ledger-backup"
    pub id: String,

    /// Path to a JSON keypair file; the provider is only detected while it exists
    pub keypair_path: PathBuf,

    /// Signing protocol this provider exposes
    #[serde(default)]
    pub protocol: SigningMode,

    /// Prompt before the provider hands out its public key
    #[serde(default)]
    pub approve_connect: bool,
}

/// Signing capability a keypair provider exposes
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SigningMode {
    /// Signs and hands the transaction back for broadcast
    #[default]
    SignOnly,
    /// Signs and submits through its own RPC connection
    SignAndSend,
}

// Default value functions
fn default_rpc_endpoint() -> String {
    std::env::var("RPC_ENDPOINT").unwrap_or_else(|_| "https://api.mainnet-beta.solana.com".into())
}

fn default_timeout_ms() -> u64 {
    30000
}

fn default_commitment() -> String {
    "confirmed".into()
}

fn default_token_program() -> String {
    spl_token::ID.to_string()
}

fn default_pacing_delay_ms() -> u64 {
    1000
}

fn default_confirm_timeout_ms() -> u64 {
    60000
}

fn default_confirm_poll_interval_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

impl RpcConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed commitment level (validated on load)
    pub fn commitment_config(&self) -> CommitmentConfig {
        CommitmentConfig::from_str(&self.commitment).unwrap_or_else(|_| CommitmentConfig::confirmed())
    }
}

impl ReclaimConfig {
    /// Parsed token program id (validated on load)
    pub fn token_program_id(&self) -> Result<Pubkey> {
        Pubkey::from_str(&self.token_program)
            .with_context(|| format!("Invalid token_program: {}", self.token_program))
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }

    pub fn confirm_poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirm_poll_interval_ms)
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Start with defaults
            .set_default("rpc.endpoint", default_rpc_endpoint())?
            .set_default("rpc.timeout_ms", default_timeout_ms() as i64)?
            .set_default("rpc.commitment", default_commitment())?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix RECLAIM__)
            .add_source(
                config::Environment::with_prefix("RECLAIM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.rpc.endpoint.is_empty() {
            anyhow::bail!("rpc.endpoint cannot be empty");
        }

        CommitmentConfig::from_str(&self.rpc.commitment)
            .map_err(|_| anyhow::anyhow!("Invalid rpc.commitment: {}", self.rpc.commitment))?;

        self.reclaim.token_program_id()?;

        if self.reclaim.confirm_timeout_ms == 0 {
            anyhow::bail!("confirm_timeout_ms must be positive");
        }

        if self.reclaim.confirm_poll_interval_ms == 0 {
            anyhow::bail!("confirm_poll_interval_ms must be positive");
        }

        let mut seen = HashSet::new();
        for provider in &self.wallet.providers {
            if provider.id.trim().is_empty() {
                anyhow::bail!("Wallet provider id cannot be empty");
            }
            if !seen.insert(provider.id.as_str()) {
                anyhow::bail!("Duplicate wallet provider id: {}", provider.id);
            }
        }

        if self.reclaim.skip_preflight {
            tracing::warn!("skip_preflight is enabled - malformed closes will only fail on-chain");
        }

        Ok(())
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        let providers = if self.wallet.providers.is_empty() {
            "    (none configured)\n".to_string()
        } else {
            self.wallet
                .providers
                .iter()
                .map(|p| {
                    format!(
                        "    {}: {} ({:?}, approve_connect={})\n",
                        p.id,
                        p.keypair_path.display(),
                        p.protocol,
                        p.approve_connect
                    )
                })
                .collect()
        };

        format!(
            r#"Configuration:
  RPC:
    endpoint: {}
    timeout: {}ms
    commitment: {}
  Reclaim:
    token_program: {}
    pacing_delay: {}ms
    confirm_timeout: {}ms
    skip_preflight: {}
    require_confirmation: {}
  Wallet providers:
{}"#,
            mask_url(&self.rpc.endpoint),
            self.rpc.timeout_ms,
            self.rpc.commitment,
            self.reclaim.token_program,
            self.reclaim.pacing_delay_ms,
            self.reclaim.confirm_timeout_ms,
            self.reclaim.skip_preflight,
            self.reclaim.require_confirmation,
            providers,
        )
    }
}

/// Mask URL for display (hide API keys in query params)
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc: RpcConfig {
                endpoint: default_rpc_endpoint(),
                timeout_ms: default_timeout_ms(),
                commitment: default_commitment(),
            },
            reclaim: ReclaimConfig::default(),
            wallet: WalletConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.reclaim.token_program_id().unwrap(), spl_token::ID);
        assert_eq!(config.reclaim.pacing_delay_ms, 1000);
        assert!(config.reclaim.require_confirmation);
        assert!(config.wallet.providers.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_signing_mode_deserialize() {
        let mode: SigningMode = serde_json::from_str(r#""sign_and_send""#).unwrap();
        assert_eq!(mode, SigningMode::SignAndSend);
        let mode: SigningMode = serde_json::from_str(r#""sign_only""#).unwrap();
        assert_eq!(mode, SigningMode::SignOnly);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reclaim.toml");
        std::fs::write(
            &path,
            r#"
[rpc]
endpoint = "https://rpc.example.com?api-key=secret"

[reclaim]
pacing_delay_ms = 250

[[wallet.providers]]
id = "hot"
keypair_path = "keys/hot.json"
protocol = "sign_and_send"

[[wallet.providers]]
id = "cold"
keypair_path = "keys/cold.json"
approve_connect = true
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.reclaim.pacing_delay_ms, 250);
        assert_eq!(config.reclaim.confirm_timeout_ms, 60000);
        assert_eq!(config.wallet.providers.len(), 2);
        assert_eq!(config.wallet.providers[0].protocol, SigningMode::SignAndSend);
        assert_eq!(config.wallet.providers[1].protocol, SigningMode::SignOnly);
        assert!(config.wallet.providers[1].approve_connect);

        let display = config.masked_display();
        assert!(display.contains("https://rpc.example.com?***"));
        assert!(!display.contains("secret"));
    }

    #[test]
    fn test_duplicate_provider_rejected() {
        let mut config = Config::default();
        let entry = ProviderEntry {
            id: "hot".into(),
            keypair_path: PathBuf::from("a.json"),
            protocol: SigningMode::SignOnly,
            approve_connect: false,
        };
        config.wallet.providers = vec![entry.clone(), entry];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_token_program_rejected() {
        let mut config = Config::default();
        config.reclaim.token_program = "not-a-key".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_confirm_timeout_rejected() {
        let mut config = Config::default();
        config.reclaim.confirm_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("confirm_timeout_ms"));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let mut config = Config::default();
        config.reclaim.confirm_poll_interval_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("confirm_poll_interval_ms"));
    }

    #[test]
    fn test_mask_url() {
        assert_eq!(
            mask_url("https://api.example.com?key=secret"),
            "https://api.example.com?***"
        );
        assert_eq!(mask_url("https://api.example.com"), "https://api.example.com");
    }
}
