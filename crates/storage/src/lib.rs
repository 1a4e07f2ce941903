//! Embedded ledgers for the faucet, backed by sled.

pub mod claims;
pub mod error;
pub mod journal;
pub mod transactions;

pub use claims::{ClaimRecord, ClaimWrite, CooldownLedger};
pub use error::{Result, StorageError};
pub use journal::{PendingSend, SendJournal, SendState};
pub use transactions::{LedgerTotals, TransactionLedger, TransactionRecord};

use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// The faucet's persistent state: the cooldown ledger in its own database,
/// the transaction ledger and the send journal sharing a second one.
#[derive(Clone)]
pub struct Ledgers {
    pub claims: Arc<CooldownLedger>,
    pub transactions: Arc<TransactionLedger>,
    pub journal: Arc<SendJournal>,
    transactions_db: sled::Db,
}

impl Ledgers {
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(addresses_path: P, transactions_path: Q) -> Result<Self> {
        info!("Opening address ledger at: {}", addresses_path.as_ref().display());
        let claims = CooldownLedger::open(addresses_path)?;

        info!("Opening transaction ledger at: {}", transactions_path.as_ref().display());
        let transactions_db = sled::Config::default()
            .path(transactions_path.as_ref())
            .cache_capacity(16 * 1024 * 1024)
            .open()?;

        Ok(Self {
            claims: Arc::new(claims),
            transactions: Arc::new(TransactionLedger::from_db(&transactions_db)?),
            journal: Arc::new(SendJournal::from_db(&transactions_db)?),
            transactions_db,
        })
    }

    pub async fn flush(&self) -> Result<()> {
        self.claims.flush().await?;
        self.transactions_db.flush_async().await?;
        Ok(())
    }
}
