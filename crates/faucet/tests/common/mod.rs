#![allow(dead_code)]

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use xenium_faucet::wallet::{Destination, OpenWallet, WalletBalance, WalletStatus};
use xenium_faucet::{
    CaptchaVerifier, FaucetConfig, FaucetError, FaucetResult, FaucetService, WalletGateway,
};
use xenium_common::utils::logging::init_test_logging;
use xenium_storage::Ledgers;

pub fn faucet_address() -> String {
    format!("XNU{}", "f".repeat(95))
}

pub fn address(fill: char) -> String {
    format!("XNU{}", fill.to_string().repeat(95))
}

/// Wallet double that records every send
pub struct MockWallet {
    pub unlocked: AtomicU64,
    pub fail_sends: AtomicBool,
    pub send_delay: Duration,
    pub sends: Mutex<Vec<Destination>>,
    next_hash: AtomicUsize,
}

impl MockWallet {
    pub fn new(unlocked: u64) -> Self {
        Self::with_delay(unlocked, Duration::ZERO)
    }

    pub fn with_delay(unlocked: u64, send_delay: Duration) -> Self {
        Self {
            unlocked: AtomicU64::new(unlocked),
            fail_sends: AtomicBool::new(false),
            send_delay,
            sends: Mutex::new(Vec::new()),
            next_hash: AtomicUsize::new(0),
        }
    }

    pub fn send_count(&self) -> usize {
        self.sends.lock().unwrap().len()
    }
}

#[async_trait]
impl WalletGateway for MockWallet {
    async fn open(&self, _params: &OpenWallet) -> FaucetResult<()> {
        Ok(())
    }

    async fn primary_address(&self) -> FaucetResult<String> {
        Ok(faucet_address())
    }

    async fn balance(&self) -> FaucetResult<WalletBalance> {
        Ok(WalletBalance {
            unlocked: self.unlocked.load(Ordering::SeqCst),
            locked: 0,
        })
    }

    async fn status(&self) -> FaucetResult<WalletStatus> {
        Ok(WalletStatus {
            hashrate: 2_000,
            wallet_block_count: 10,
            network_block_count: 10,
            peer_count: 3,
        })
    }

    async fn send_advanced(&self, destinations: &[Destination]) -> FaucetResult<String> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(FaucetError::Wallet("Not enough unlocked funds".to_string()));
        }
        // Counted as sent on entry; the delay stands in for the wallet
        // broadcasting and answering
        self.sends.lock().unwrap().extend_from_slice(destinations);
        if !self.send_delay.is_zero() {
            tokio::time::sleep(self.send_delay).await;
        }
        let n = self.next_hash.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{:064x}", n + 1))
    }
}

/// Captcha double with a fixed answer
pub struct FixedCaptcha(pub bool);

#[async_trait]
impl CaptchaVerifier for FixedCaptcha {
    async fn verify(&self, token: Option<&str>, _remote_ip: Option<std::net::IpAddr>) -> FaucetResult<bool> {
        Ok(self.0 && token.is_some())
    }
}

pub struct Harness {
    pub wallet: Arc<MockWallet>,
    pub ledgers: Ledgers,
    pub service: Arc<FaucetService>,
    /// Dropped last, after the databases inside it are closed
    pub dir: Option<TempDir>,
}

pub fn harness(config: FaucetConfig, wallet: MockWallet, captcha: Option<Arc<dyn CaptchaVerifier>>) -> Harness {
    let dir = TempDir::new().unwrap();
    let mut h = harness_at(dir.path(), config, wallet, captcha);
    h.dir = Some(dir);
    h
}

pub fn open_ledgers(data_dir: &Path) -> Ledgers {
    Ledgers::open(data_dir.join("addresses.db"), data_dir.join("transactions.db")).unwrap()
}

/// Service over ledgers in `data_dir`, which the caller owns
pub fn harness_at(
    data_dir: &Path,
    config: FaucetConfig,
    wallet: MockWallet,
    captcha: Option<Arc<dyn CaptchaVerifier>>,
) -> Harness {
    init_test_logging();
    let ledgers = open_ledgers(data_dir);
    let wallet = Arc::new(wallet);
    let service = Arc::new(
        FaucetService::new(
            Arc::new(config),
            ledgers.clone(),
            wallet.clone(),
            captcha,
            faucet_address(),
        )
        .unwrap(),
    );
    Harness {
        wallet,
        ledgers,
        service,
        dir: None,
    }
}
