//! Scripted collaborators shared by unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};

use crate::error::{Error, Result};
use crate::ledger::{Ledger, RawBalance, TokenAccountRecord};
use crate::reclaim::OutcomeSink;
use crate::wallet::{Capabilities, ProviderError, ProviderHandle, ProviderSource, WalletProvider};

/// Rent-exempt minimum of a 165-byte token account
pub const TOKEN_ACCOUNT_RENT: u64 = 2_039_280;

/// A token account owned by `owner` with the given balance
pub fn record(owner: &Pubkey, balance: RawBalance) -> TokenAccountRecord {
    TokenAccountRecord {
        address: Pubkey::new_unique(),
        owner: *owner,
        mint: Some(Pubkey::new_unique()),
        lamports: TOKEN_ACCOUNT_RENT,
        balance,
    }
}

/// Wallet provider with a real keypair and scripted behaviour
pub struct FakeProvider {
    id: String,
    keypair: Keypair,
    capabilities: Capabilities,
    connected: AtomicBool,
    hands_out_key: bool,
    rejects_connect: bool,
    fails_disconnect: bool,
    fail_sign_at: Option<usize>,
    send_results: Mutex<VecDeque<std::result::Result<Signature, ProviderError>>>,
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    sign_calls: AtomicUsize,
    send_calls: AtomicUsize,
}

impl FakeProvider {
    fn with_capabilities(id: &str, capabilities: Capabilities) -> Self {
        Self {
            id: id.to_string(),
            keypair: Keypair::new(),
            capabilities,
            connected: AtomicBool::new(false),
            hands_out_key: true,
            rejects_connect: false,
            fails_disconnect: false,
            fail_sign_at: None,
            send_results: Mutex::new(VecDeque::new()),
            connect_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
            sign_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
        }
    }

    pub fn sign_only(id: &str) -> Self {
        Self::with_capabilities(
            id,
            Capabilities {
                connect: true,
                disconnect: true,
                sign_transaction: true,
                sign_and_send_transaction: false,
            },
        )
    }

    pub fn sign_and_send(id: &str) -> Self {
        Self::with_capabilities(
            id,
            Capabilities {
                connect: true,
                disconnect: true,
                sign_transaction: false,
                sign_and_send_transaction: true,
            },
        )
    }

    pub fn no_signing(id: &str) -> Self {
        Self::with_capabilities(
            id,
            Capabilities {
                connect: true,
                disconnect: true,
                ..Default::default()
            },
        )
    }

    pub fn failing_disconnect(mut self) -> Self {
        self.fails_disconnect = true;
        self
    }

    pub fn without_disconnect(mut self) -> Self {
        self.capabilities.disconnect = false;
        self
    }

    pub fn without_connect(mut self) -> Self {
        self.capabilities.connect = false;
        self
    }

    pub fn already_connected(self) -> Self {
        self.connected.store(true, Ordering::SeqCst);
        self
    }

    pub fn rejecting_connect(mut self) -> Self {
        self.rejects_connect = true;
        self
    }

    pub fn without_public_key(mut self) -> Self {
        self.hands_out_key = false;
        self
    }

    /// Reject the `index`-th signing request (zero-based)
    pub fn failing_sign_at(mut self, index: usize) -> Self {
        self.fail_sign_at = Some(index);
        self
    }

    /// Results handed back by successive sign-and-send calls
    pub fn with_send_results(
        self,
        results: Vec<std::result::Result<Signature, ProviderError>>,
    ) -> Self {
        *self.send_results.lock().unwrap() = results.into();
        self
    }

    pub fn key(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst) + self.send_calls.load(Ordering::SeqCst)
    }

    fn sign(&self, mut transaction: Transaction) -> std::result::Result<Transaction, ProviderError> {
        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_sign(&[&self.keypair], blockhash)
            .map_err(|e| ProviderError::Failed(e.to_string()))?;
        Ok(transaction)
    }
}

#[async_trait]
impl WalletProvider for FakeProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn public_key(&self) -> Option<Pubkey> {
        (self.is_connected() && self.hands_out_key).then(|| self.keypair.pubkey())
    }

    async fn connect(&self) -> std::result::Result<Option<Pubkey>, ProviderError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.rejects_connect {
            return Err(ProviderError::Rejected("user declined connection".into()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(self.public_key())
    }

    async fn disconnect(&self) -> std::result::Result<(), ProviderError> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        if self.fails_disconnect {
            return Err(ProviderError::Failed("extension not responding".into()));
        }
        Ok(())
    }

    async fn sign_transaction(
        &self,
        transaction: Transaction,
    ) -> std::result::Result<Transaction, ProviderError> {
        let index = self.sign_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_at == Some(index) {
            return Err(ProviderError::Rejected("user declined".into()));
        }
        self.sign(transaction)
    }

    async fn sign_and_send_transaction(
        &self,
        transaction: Transaction,
    ) -> std::result::Result<Signature, ProviderError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        let signed = self.sign(transaction)?;
        match self.send_results.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(signed.signatures[0]),
        }
    }
}

/// Fixed provider list
pub struct StaticProviders {
    providers: Vec<ProviderHandle>,
}

impl StaticProviders {
    pub fn new(providers: Vec<ProviderHandle>) -> Self {
        Self { providers }
    }
}

impl ProviderSource for StaticProviders {
    fn detect(&self) -> Vec<ProviderHandle> {
        self.providers.clone()
    }
}

/// How the fake ledger settles signatures
#[derive(Debug, Clone)]
pub enum ConfirmBehavior {
    Confirm,
    TimeOut,
    Fail(String),
}

/// Ledger serving scripted accounts and recording every write
pub struct FakeLedger {
    accounts: Vec<TokenAccountRecord>,
    scan_error: Option<String>,
    blockhash_fails: bool,
    failing_broadcasts: Vec<usize>,
    confirm: ConfirmBehavior,
    scan_queries: Mutex<Vec<(Pubkey, Pubkey)>>,
    issued: Mutex<Vec<Hash>>,
    broadcast_calls: AtomicUsize,
    broadcasts: Mutex<Vec<Transaction>>,
    confirmed: Mutex<Vec<Signature>>,
}

impl FakeLedger {
    pub fn with_accounts(accounts: Vec<TokenAccountRecord>) -> Self {
        Self {
            accounts,
            scan_error: None,
            blockhash_fails: false,
            failing_broadcasts: Vec::new(),
            confirm: ConfirmBehavior::Confirm,
            scan_queries: Mutex::new(Vec::new()),
            issued: Mutex::new(Vec::new()),
            broadcast_calls: AtomicUsize::new(0),
            broadcasts: Mutex::new(Vec::new()),
            confirmed: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_scan(message: &str) -> Self {
        let mut ledger = Self::with_accounts(Vec::new());
        ledger.scan_error = Some(message.to_string());
        ledger
    }

    pub fn failing_blockhash(mut self) -> Self {
        self.blockhash_fails = true;
        self
    }

    /// Reject the `index`-th broadcast (zero-based)
    pub fn failing_broadcast_at(mut self, index: usize) -> Self {
        self.failing_broadcasts.push(index);
        self
    }

    pub fn confirming(mut self, behavior: ConfirmBehavior) -> Self {
        self.confirm = behavior;
        self
    }

    pub fn scan_queries(&self) -> Vec<(Pubkey, Pubkey)> {
        self.scan_queries.lock().unwrap().clone()
    }

    pub fn issued_blockhashes(&self) -> Vec<Hash> {
        self.issued.lock().unwrap().clone()
    }

    /// Successfully broadcast transactions, decoded
    pub fn broadcasts(&self) -> Vec<Transaction> {
        self.broadcasts.lock().unwrap().clone()
    }

    /// Signatures confirmation was awaited on
    pub fn confirmed(&self) -> Vec<Signature> {
        self.confirmed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        program_id: &Pubkey,
    ) -> Result<Vec<TokenAccountRecord>> {
        self.scan_queries.lock().unwrap().push((*owner, *program_id));
        match &self.scan_error {
            Some(message) => Err(Error::Rpc(message.clone())),
            None => Ok(self.accounts.clone()),
        }
    }

    async fn latest_blockhash(&self) -> Result<Hash> {
        if self.blockhash_fails {
            return Err(Error::Rpc("blockhash not available".into()));
        }
        let hash = Hash::new_unique();
        self.issued.lock().unwrap().push(hash);
        Ok(hash)
    }

    async fn broadcast_raw_transaction(&self, bytes: &[u8]) -> Result<Signature> {
        let index = self.broadcast_calls.fetch_add(1, Ordering::SeqCst);
        let transaction: Transaction = bincode::deserialize(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))?;
        if self.failing_broadcasts.contains(&index) {
            return Err(Error::TransactionSend("node is behind".into()));
        }
        let signature = transaction.signatures[0];
        self.broadcasts.lock().unwrap().push(transaction);
        Ok(signature)
    }

    async fn await_confirmation(&self, signature: &Signature) -> Result<()> {
        self.confirmed.lock().unwrap().push(*signature);
        match &self.confirm {
            ConfirmBehavior::Confirm => Ok(()),
            ConfirmBehavior::TimeOut => Err(Error::RpcTimeout(60_000)),
            ConfirmBehavior::Fail(reason) => Err(Error::TransactionFailed(reason.clone())),
        }
    }
}

/// Sink collecting every emitted line
#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl OutcomeSink for MemorySink {
    fn emit(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}
