//! Append-only ledger of every payout the wallet acknowledged.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use sled::Tree;
use tracing::{debug, warn};

/// One acknowledged send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub address: String,
    /// Atomic units
    pub amount: u64,
    pub tx_hash: String,
    /// Unix milliseconds
    pub recorded_at: i64,
}

/// Aggregates used by the status poller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerTotals {
    pub count: u64,
    /// Atomic units
    pub total_amount: u64,
}

/// Transaction records keyed by transaction hash. Records are inserted with
/// compare-and-swap against an empty slot and are never rewritten.
pub struct TransactionLedger {
    transactions: Tree,
}

impl TransactionLedger {
    pub fn from_db(db: &sled::Db) -> Result<Self> {
        Ok(Self {
            transactions: db.open_tree("transactions")?,
        })
    }

    /// Append a record. Returns `false` when a record with the same hash is
    /// already present; the stored record is left untouched.
    pub fn append(&self, record: &TransactionRecord) -> Result<bool> {
        let value = bincode::serialize(record)?;
        let swapped = self.transactions.compare_and_swap(
            record.tx_hash.as_bytes(),
            None as Option<&[u8]>,
            Some(value),
        )?;

        match swapped {
            Ok(()) => {
                debug!("Recorded transaction {} for {}", record.tx_hash, record.address);
                Ok(true)
            }
            Err(_) => {
                warn!("Transaction {} already recorded, keeping existing entry", record.tx_hash);
                Ok(false)
            }
        }
    }

    pub fn find(&self, tx_hash: &str) -> Result<Option<TransactionRecord>> {
        match self.transactions.get(tx_hash.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// All records, oldest first
    pub fn list(&self) -> Result<Vec<TransactionRecord>> {
        let mut records: Vec<TransactionRecord> = Vec::with_capacity(self.transactions.len());
        for item in self.transactions.iter() {
            let (_, value) = item?;
            records.push(bincode::deserialize(&value)?);
        }
        records.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at));
        Ok(records)
    }

    pub fn totals(&self) -> Result<LedgerTotals> {
        let mut totals = LedgerTotals::default();
        for item in self.transactions.iter() {
            let (_, value) = item?;
            let record: TransactionRecord = bincode::deserialize(&value)?;
            totals.count += 1;
            totals.total_amount = totals.total_amount.saturating_add(record.amount);
        }
        Ok(totals)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
