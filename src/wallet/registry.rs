//! Provider detection
//!
//! Providers can appear and disappear at runtime, so detection is re-evaluated
//! on every call rather than cached once at startup.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use tracing::{debug, warn};

use crate::config::{ProviderEntry, SigningMode};

use super::keypair::KeypairProvider;
use super::provider::ProviderHandle;

/// Source of currently available wallet providers
pub trait ProviderSource: Send + Sync {
    /// Providers available right now, in detection order
    fn detect(&self) -> Vec<ProviderHandle>;
}

/// Keypair providers declared in configuration
///
/// A provider is detected while its keypair file exists. Provider objects are
/// cached per id so their connection flag survives repeated detection; a
/// provider whose file disappears is dropped from the cache.
pub struct ConfiguredProviders {
    entries: Vec<ProviderEntry>,
    rpc: Arc<RpcClient>,
    send_config: RpcSendTransactionConfig,
    loaded: Mutex<HashMap<String, Arc<KeypairProvider>>>,
}

impl ConfiguredProviders {
    pub fn new(
        entries: Vec<ProviderEntry>,
        rpc: Arc<RpcClient>,
        send_config: RpcSendTransactionConfig,
    ) -> Self {
        Self {
            entries,
            rpc,
            send_config,
            loaded: Mutex::new(HashMap::new()),
        }
    }

    fn load(&self, entry: &ProviderEntry) -> Option<Arc<KeypairProvider>> {
        let rpc = (entry.protocol == SigningMode::SignAndSend).then(|| self.rpc.clone());

        match KeypairProvider::from_entry(entry, rpc, self.send_config) {
            Ok(provider) => Some(Arc::new(provider)),
            Err(e) => {
                warn!("Skipping wallet provider {}: {}", entry.id, e);
                None
            }
        }
    }
}

impl ProviderSource for ConfiguredProviders {
    fn detect(&self) -> Vec<ProviderHandle> {
        let mut loaded = self.loaded.lock().unwrap_or_else(|e| e.into_inner());
        let mut detected: Vec<ProviderHandle> = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            if !entry.keypair_path.exists() {
                if loaded.remove(&entry.id).is_some() {
                    debug!("Wallet provider {} disappeared", entry.id);
                }
                continue;
            }

            let provider = match loaded.get(&entry.id) {
                Some(provider) => provider.clone(),
                None => match self.load(entry) {
                    Some(provider) => {
                        loaded.insert(entry.id.clone(), provider.clone());
                        provider
                    }
                    None => continue,
                },
            };

            detected.push(provider);
        }

        detected
    }
}
