//! Cached wallet and network statistics for the pages.
//!
//! The poller is the only writer. Each cycle builds a complete
//! [`WalletStatusSnapshot`] and publishes it as a new `Arc`, so readers
//! either see the previous snapshot or the next one, never a mix.

use crate::error::FaucetResult;
use crate::metrics;
use crate::wallet::WalletGateway;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};
use xenium_common::utils::format::{group_thousands, percentage, pretty_atomic, readable_hashrate};
use xenium_storage::{CooldownLedger, TransactionLedger};

/// Display-ready statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletStatusSnapshot {
    pub net_hashrate: String,
    pub wallet_block_height: String,
    pub network_block_height: String,
    pub sync_percent: String,
    pub peer_count: String,
    pub total_balance: String,
    pub unlocked_balance: String,
    pub locked_balance: String,
    pub addresses_known: String,
    pub total_transactions_sent: String,
    pub total_coins_sent: String,
    /// `None` until the first successful poll
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for WalletStatusSnapshot {
    fn default() -> Self {
        Self {
            net_hashrate: "0 H/s".to_string(),
            wallet_block_height: "0".to_string(),
            network_block_height: "0".to_string(),
            sync_percent: "0.00".to_string(),
            peer_count: "0".to_string(),
            total_balance: "0".to_string(),
            unlocked_balance: "0".to_string(),
            locked_balance: "0".to_string(),
            addresses_known: "0".to_string(),
            total_transactions_sent: "0".to_string(),
            total_coins_sent: "0".to_string(),
            updated_at: None,
        }
    }
}

/// Write side of the snapshot cell, owned by the poller
pub struct StatusPublisher {
    sender: watch::Sender<Arc<WalletStatusSnapshot>>,
}

/// Read side of the snapshot cell, cloned into every request handler
#[derive(Clone)]
pub struct StatusHandle {
    receiver: watch::Receiver<Arc<WalletStatusSnapshot>>,
}

pub fn status_channel() -> (StatusPublisher, StatusHandle) {
    let (sender, receiver) = watch::channel(Arc::new(WalletStatusSnapshot::default()));
    (StatusPublisher { sender }, StatusHandle { receiver })
}

impl StatusPublisher {
    pub fn publish(&self, snapshot: WalletStatusSnapshot) -> Arc<WalletStatusSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.sender.send_replace(snapshot.clone());
        snapshot
    }
}

impl StatusHandle {
    pub fn current(&self) -> Arc<WalletStatusSnapshot> {
        self.receiver.borrow().clone()
    }
}

/// Refreshes the snapshot on a fixed interval
pub struct StatusPoller {
    wallet: Arc<dyn WalletGateway>,
    claims: Arc<CooldownLedger>,
    transactions: Arc<TransactionLedger>,
    decimal_places: u32,
    interval: Duration,
    publisher: StatusPublisher,
}

impl StatusPoller {
    pub fn new(
        wallet: Arc<dyn WalletGateway>,
        claims: Arc<CooldownLedger>,
        transactions: Arc<TransactionLedger>,
        decimal_places: u32,
        interval: Duration,
        publisher: StatusPublisher,
    ) -> Self {
        Self {
            wallet,
            claims,
            transactions,
            decimal_places,
            interval,
            publisher,
        }
    }

    /// Run one cycle. Any failing query aborts the cycle and leaves the
    /// published snapshot untouched.
    pub async fn poll_once(&self) -> FaucetResult<Arc<WalletStatusSnapshot>> {
        let status = self.wallet.status().await?;
        let balance = self.wallet.balance().await?;
        let addresses_known = self.claims.len() as u64;
        let totals = self.transactions.totals()?;

        let snapshot = WalletStatusSnapshot {
            net_hashrate: readable_hashrate(status.hashrate, 2),
            wallet_block_height: group_thousands(status.wallet_block_count),
            network_block_height: group_thousands(status.network_block_count),
            sync_percent: percentage(status.wallet_block_count, status.network_block_count),
            peer_count: group_thousands(status.peer_count),
            total_balance: pretty_atomic(balance.total(), self.decimal_places),
            unlocked_balance: pretty_atomic(balance.unlocked, self.decimal_places),
            locked_balance: pretty_atomic(balance.locked, self.decimal_places),
            addresses_known: group_thousands(addresses_known),
            total_transactions_sent: group_thousands(totals.count),
            total_coins_sent: pretty_atomic(totals.total_amount, self.decimal_places),
            updated_at: Some(Utc::now()),
        };

        metrics::WALLET_UNLOCKED_BALANCE.set(i64::try_from(balance.unlocked).unwrap_or(i64::MAX));
        debug!(
            "Status: hashrate {}, sync {}/{} ({}%), peers {}, unlocked {}, locked {}, addresses {}, sent {} txs / {}",
            snapshot.net_hashrate,
            snapshot.wallet_block_height,
            snapshot.network_block_height,
            snapshot.sync_percent,
            snapshot.peer_count,
            snapshot.unlocked_balance,
            snapshot.locked_balance,
            snapshot.addresses_known,
            snapshot.total_transactions_sent,
            snapshot.total_coins_sent,
        );

        Ok(self.publisher.publish(snapshot))
    }

    /// Poll forever, starting immediately
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = self.poll_once().await {
                metrics::STATUS_POLL_FAILURES_TOTAL.inc();
                warn!("An error occurred whilst updating the wallet status: {}", e);
            }
        }
    }
}
