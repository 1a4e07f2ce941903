//! Repairs ledgers from send journal entries left behind by an interrupted claim

use crate::error::FaucetResult;
use crate::metrics;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use xenium_storage::{Ledgers, PendingSend, SendState, TransactionRecord};

/// What one sweep did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// `Sent` entries written into both ledgers and removed
    pub completed: usize,
    /// `Pending` entries past the grace period, now `Unresolved`
    pub unresolved: usize,
}

pub struct Reconciler {
    ledgers: Ledgers,
}

impl Reconciler {
    pub fn new(ledgers: Ledgers) -> Self {
        Self { ledgers }
    }

    /// Walk the journal once. `Pending` entries younger than `in_flight_grace`
    /// belong to a claim that is still running and are skipped.
    pub async fn sweep(&self, now_ms: i64, in_flight_grace: Duration) -> FaucetResult<ReconcileReport> {
        let grace_ms = i64::try_from(in_flight_grace.as_millis()).unwrap_or(i64::MAX);
        let mut report = ReconcileReport::default();

        for entry in self.ledgers.journal.entries()? {
            match &entry.state {
                SendState::Sent { tx_hash, sent_at } => {
                    self.replay_sent(&entry, tx_hash, *sent_at).await?;
                    report.completed += 1;
                }
                SendState::Pending if now_ms.saturating_sub(entry.created_at) >= grace_ms => {
                    // The wallet may or may not have sent; keep the address out
                    // of the faucet until an operator looks at it.
                    self.ledgers.claims.record_claim(&entry.address, entry.created_at)?;
                    self.ledgers.claims.flush().await?;
                    self.ledgers.journal.mark_unresolved(entry.id).await?;
                    warn!(
                        "Send of {} to {} (journal entry {}) has an unknown outcome, marked unresolved",
                        entry.amount, entry.address, entry.id
                    );
                    report.unresolved += 1;
                }
                SendState::Pending | SendState::Unresolved => {}
            }
        }

        metrics::PENDING_SENDS.set(self.ledgers.journal.len() as i64);
        if report != ReconcileReport::default() {
            info!(
                "Reconciled send journal: {} completed, {} unresolved",
                report.completed, report.unresolved
            );
        }
        Ok(report)
    }

    async fn replay_sent(&self, entry: &PendingSend, tx_hash: &str, sent_at: i64) -> FaucetResult<()> {
        self.ledgers.claims.record_claim(&entry.address, sent_at)?;
        // The cooldown ledger is a separate database; it must be on disk
        // before the entry that could replay it is gone
        self.ledgers.claims.flush().await?;
        self.ledgers.transactions.append(&TransactionRecord {
            address: entry.address.clone(),
            amount: entry.amount,
            tx_hash: tx_hash.to_string(),
            recorded_at: sent_at,
        })?;
        self.ledgers.journal.complete(entry.id).await?;
        info!("Recovered transaction {} to {}", tx_hash, entry.address);
        Ok(())
    }

    /// Sweep on a fixed interval. The first tick fires after one interval,
    /// the startup sweep is run separately.
    pub async fn run(self, interval: Duration, in_flight_grace: Duration) {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let now_ms = chrono::Utc::now().timestamp_millis();
            if let Err(e) = self.sweep(now_ms, in_flight_grace).await {
                error!("Send journal sweep failed: {}", e);
            }
        }
    }
}
