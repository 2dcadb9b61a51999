//! Wallet session manager
//!
//! Holds the single active provider session. Opening a session always tears
//! down whatever was active before it, so two providers can never both be
//! considered connected. Provider teardown is best-effort: failures are logged
//! and returned in a [`TeardownReport`], and the local state is reset anyway.

use std::fmt;
use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::provider::{ProviderError, ProviderHandle, SigningProtocol, WalletProvider};
use super::registry::ProviderSource;

/// An open session with one provider
#[derive(Clone)]
pub struct ActiveSession {
    provider: ProviderHandle,
    address: Pubkey,
    protocol: SigningProtocol,
}

impl ActiveSession {
    pub fn provider(&self) -> &ProviderHandle {
        &self.provider
    }

    pub fn provider_id(&self) -> &str {
        self.provider.id()
    }

    /// Owner address resolved at connect time
    pub fn address(&self) -> Pubkey {
        self.address
    }

    /// Signing protocol fixed at connect time
    pub fn protocol(&self) -> SigningProtocol {
        self.protocol
    }
}

impl fmt::Debug for ActiveSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveSession")
            .field("provider", &self.provider.id())
            .field("address", &self.address)
            .field("protocol", &self.protocol)
            .finish()
    }
}

/// Observable session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

enum Session {
    Disconnected,
    Connecting(ProviderHandle),
    Connected(ActiveSession),
}

impl Session {
    fn state(&self) -> SessionState {
        match self {
            Session::Disconnected => SessionState::Disconnected,
            Session::Connecting(_) => SessionState::Connecting,
            Session::Connected(_) => SessionState::Connected,
        }
    }

    /// Take the held provider, leaving the session disconnected
    fn take_provider(&mut self) -> Option<ProviderHandle> {
        match std::mem::replace(self, Session::Disconnected) {
            Session::Disconnected => None,
            Session::Connecting(provider) => Some(provider),
            Session::Connected(active) => Some(active.provider),
        }
    }
}

/// A provider teardown that failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownFailure {
    pub provider_id: String,
    pub error: ProviderError,
}

/// Outcome of a best-effort teardown pass
#[derive(Debug, Clone, Default)]
pub struct TeardownReport {
    /// Providers whose teardown was invoked
    pub attempted: Vec<String>,
    pub failures: Vec<TeardownFailure>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn merge(&mut self, other: TeardownReport) {
        self.attempted.extend(other.attempted);
        self.failures.extend(other.failures);
    }
}

/// Owns the single active wallet session
pub struct WalletSessionManager {
    source: Arc<dyn ProviderSource>,
    session: Mutex<Session>,
}

impl WalletSessionManager {
    pub fn new(source: Arc<dyn ProviderSource>) -> Self {
        Self {
            source,
            session: Mutex::new(Session::Disconnected),
        }
    }

    /// Enumerate currently available providers (re-evaluated every call)
    pub fn detect_providers(&self) -> Vec<ProviderHandle> {
        self.source.detect()
    }

    pub async fn state(&self) -> SessionState {
        self.session.lock().await.state()
    }

    /// Currently active session, if any
    pub async fn active(&self) -> Option<ActiveSession> {
        match &*self.session.lock().await {
            Session::Connected(active) => Some(active.clone()),
            _ => None,
        }
    }

    /// Open a session with `provider`, tearing down any existing session first
    pub async fn connect(&self, provider: ProviderHandle) -> Result<ActiveSession> {
        let mut session = self.session.lock().await;

        let report = Self::teardown(&mut session).await;
        log_report(&report);

        *session = Session::Connecting(provider.clone());

        match Self::open(provider).await {
            Ok(active) => {
                info!(
                    "Connected wallet {} ({}, {})",
                    active.provider_id(),
                    active.address,
                    active.protocol
                );
                *session = Session::Connected(active.clone());
                Ok(active)
            }
            Err(e) => {
                warn!("Wallet connection failed: {}", e);
                *session = Session::Disconnected;
                Err(e)
            }
        }
    }

    /// Open a session with the detected provider named `id`
    pub async fn connect_by_id(&self, id: &str) -> Result<ActiveSession> {
        let provider = self
            .detect_providers()
            .into_iter()
            .find(|p| p.id() == id)
            .ok_or_else(|| Error::ProviderUnavailable(id.to_string()))?;

        self.connect(provider).await
    }

    /// Resolve the provider a run should use
    ///
    /// An explicit id must be among the detected providers. Without one, a
    /// provider that already reports itself connected wins over detection order.
    pub fn select_provider(&self, id: Option<&str>) -> Result<ProviderHandle> {
        let detected = self.detect_providers();

        let selected = match id {
            Some(id) => detected.into_iter().find(|p| p.id() == id),
            None => {
                let connected = detected
                    .iter()
                    .position(|p| super::provider::reports_connected(p.as_ref()));
                let index = connected.unwrap_or(0);
                detected.into_iter().nth(index)
            }
        };

        selected.ok_or_else(|| {
            Error::ProviderUnavailable(id.unwrap_or("no wallet provider detected").to_string())
        })
    }

    /// Reconnect the first detected provider that already reports itself connected
    pub async fn detect_and_connect(&self) -> Result<Option<ActiveSession>> {
        let connected = self
            .detect_providers()
            .into_iter()
            .find(|p| super::provider::reports_connected(p.as_ref()));

        match connected {
            Some(provider) => self.connect(provider).await.map(Some),
            None => Ok(None),
        }
    }

    /// Tear down the active session, if any
    pub async fn disconnect(&self) -> TeardownReport {
        let mut session = self.session.lock().await;
        let report = Self::teardown(&mut session).await;
        log_report(&report);
        report
    }

    /// Tear down every detected provider, not just the active one
    pub async fn disconnect_all(&self) -> TeardownReport {
        let mut session = self.session.lock().await;
        let active = session.take_provider();

        let detected = self.detect_providers();
        let mut report = TeardownReport::default();

        for provider in &detected {
            report.merge(teardown_provider(provider.as_ref()).await);
        }

        // The active provider may have disappeared from detection
        if let Some(active) = active {
            if !detected.iter().any(|p| p.id() == active.id()) {
                report.merge(teardown_provider(active.as_ref()).await);
            }
        }

        debug!("Disconnected {} wallet providers", report.attempted.len());
        log_report(&report);
        report
    }

    async fn teardown(session: &mut Session) -> TeardownReport {
        match session.take_provider() {
            Some(provider) => teardown_provider(provider.as_ref()).await,
            None => TeardownReport::default(),
        }
    }

    async fn open(provider: ProviderHandle) -> Result<ActiveSession> {
        let id = provider.id().to_string();
        let capabilities = provider.capabilities();

        let existing = if provider.is_connected() {
            provider.public_key()
        } else {
            None
        };

        let address = match existing {
            Some(address) => {
                debug!("Wallet {} already connected, adopting {}", id, address);
                Some(address)
            }
            // Connected without an address and no way to ask for one
            None if provider.is_connected() && !capabilities.connect => None,
            None => {
                if !capabilities.connect {
                    return Err(Error::ConnectionRejected(format!(
                        "{} does not support connect",
                        id
                    )));
                }

                provider
                    .connect()
                    .await
                    .map_err(|e| Error::ConnectionRejected(format!("{}: {}", id, e)))?
                    .or_else(|| provider.public_key())
            }
        };

        let address = address.ok_or(Error::NoPublicKeyReturned(id))?;

        Ok(ActiveSession {
            provider,
            address,
            protocol: capabilities.signing_protocol(),
        })
    }
}

async fn teardown_provider(provider: &dyn WalletProvider) -> TeardownReport {
    let mut report = TeardownReport::default();

    if !provider.capabilities().disconnect {
        return report;
    }

    report.attempted.push(provider.id().to_string());
    if let Err(error) = provider.disconnect().await {
        report.failures.push(TeardownFailure {
            provider_id: provider.id().to_string(),
            error,
        });
    }

    report
}

fn log_report(report: &TeardownReport) {
    for failure in &report.failures {
        warn!(
            "Failed to disconnect wallet {}: {}",
            failure.provider_id, failure.error
        );
    }
}
