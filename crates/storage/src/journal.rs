//! Write-ahead journal for wallet sends.
//!
//! An entry is written and flushed before the wallet is asked to send, moved
//! to [`SendState::Sent`] once the wallet returns a transaction hash, and
//! removed after both ledgers reflect the payout. Whatever is left in the
//! journal after a crash tells the reconciler which ledger writes are
//! missing.

use crate::error::{Result, StorageError};
use serde::{Deserialize, Serialize};
use sled::Tree;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SendState {
    /// Written before the wallet call
    Pending,
    /// The wallet acknowledged the send
    Sent { tx_hash: String, sent_at: i64 },
    /// The process stopped during the wallet call; outcome unknown
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSend {
    pub id: u64,
    pub address: String,
    /// Atomic units
    pub amount: u64,
    /// Unix milliseconds
    pub created_at: i64,
    pub state: SendState,
}

pub struct SendJournal {
    db: sled::Db,
    entries: Tree,
}

impl SendJournal {
    pub fn from_db(db: &sled::Db) -> Result<Self> {
        Ok(Self {
            db: db.clone(),
            entries: db.open_tree("pending_sends")?,
        })
    }

    /// Durably record the intent to send `amount` to `address`
    pub async fn begin(&self, address: &str, amount: u64, now_ms: i64) -> Result<PendingSend> {
        let entry = PendingSend {
            id: self.db.generate_id()?,
            address: address.to_string(),
            amount,
            created_at: now_ms,
            state: SendState::Pending,
        };
        self.write(&entry).await?;
        debug!("Journal entry {} opened for {}", entry.id, address);
        Ok(entry)
    }

    pub async fn mark_sent(&self, id: u64, tx_hash: &str, sent_at: i64) -> Result<PendingSend> {
        let mut entry = self.get(id)?;
        entry.state = SendState::Sent {
            tx_hash: tx_hash.to_string(),
            sent_at,
        };
        self.write(&entry).await?;
        Ok(entry)
    }

    pub async fn mark_unresolved(&self, id: u64) -> Result<PendingSend> {
        let mut entry = self.get(id)?;
        entry.state = SendState::Unresolved;
        self.write(&entry).await?;
        Ok(entry)
    }

    /// Drop an entry whose ledger writes are done
    pub async fn complete(&self, id: u64) -> Result<()> {
        self.remove(id).await?;
        debug!("Journal entry {} closed", id);
        Ok(())
    }

    /// Drop an entry whose send was refused by the wallet
    pub async fn abandon(&self, id: u64) -> Result<()> {
        self.remove(id).await?;
        debug!("Journal entry {} abandoned", id);
        Ok(())
    }

    /// Operator sign-off on an `Unresolved` entry. Returns `false`, leaving
    /// the entry in place, when it is not `Unresolved`.
    pub async fn resolve(&self, id: u64) -> Result<bool> {
        let entry = self.get(id)?;
        if entry.state != SendState::Unresolved {
            return Ok(false);
        }
        self.remove(id).await?;
        info!("Journal entry {} for {} resolved by operator", id, entry.address);
        Ok(true)
    }

    pub fn get(&self, id: u64) -> Result<PendingSend> {
        match self.entries.get(id.to_be_bytes())? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Err(StorageError::NotFound(format!("journal entry {}", id))),
        }
    }

    /// All entries, oldest first
    pub fn entries(&self) -> Result<Vec<PendingSend>> {
        let mut entries = Vec::with_capacity(self.entries.len());
        for item in self.entries.iter() {
            let (_, value) = item?;
            entries.push(bincode::deserialize(&value)?);
        }
        Ok(entries)
    }

    /// Oldest entry for `address`, in any state
    pub fn find_by_address(&self, address: &str) -> Result<Option<PendingSend>> {
        for item in self.entries.iter() {
            let (_, value) = item?;
            let entry: PendingSend = bincode::deserialize(&value)?;
            if entry.address == address {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    async fn remove(&self, id: u64) -> Result<()> {
        self.entries.remove(id.to_be_bytes())?;
        self.entries.flush_async().await?;
        Ok(())
    }

    async fn write(&self, entry: &PendingSend) -> Result<()> {
        let value = bincode::serialize(entry)?;
        self.entries.insert(entry.id.to_be_bytes(), value)?;
        self.entries.flush_async().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_journal() -> (TempDir, SendJournal) {
        let dir = TempDir::new().unwrap();
        let db = sled::open(dir.path().join("transactions.db")).unwrap();
        let journal = SendJournal::from_db(&db).unwrap();
        (dir, journal)
    }

    #[tokio::test]
    async fn test_entry_lifecycle() {
        let (_dir, journal) = open_journal();

        let entry = journal.begin("XNUabc", 1234, 100).await.unwrap();
        assert_eq!(entry.state, SendState::Pending);
        assert_eq!(journal.len(), 1);

        let sent = journal.mark_sent(entry.id, "deadbeef", 200).await.unwrap();
        assert_eq!(
            sent.state,
            SendState::Sent { tx_hash: "deadbeef".to_string(), sent_at: 200 }
        );
        assert_eq!(journal.get(entry.id).unwrap(), sent);

        journal.complete(entry.id).await.unwrap();
        assert!(journal.is_empty());
        assert!(matches!(journal.get(entry.id), Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_entries_are_ordered_by_id() {
        let (_dir, journal) = open_journal();
        let first = journal.begin("XNUone", 1, 1).await.unwrap();
        let second = journal.begin("XNUtwo", 2, 2).await.unwrap();
        journal.mark_unresolved(first.id).await.unwrap();

        let entries = journal.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, first.id);
        assert_eq!(entries[0].state, SendState::Unresolved);
        assert_eq!(entries[1].id, second.id);
    }

    #[tokio::test]
    async fn test_abandon_removes_pending_entry() {
        let (_dir, journal) = open_journal();
        let entry = journal.begin("XNUabc", 10, 1).await.unwrap();
        journal.abandon(entry.id).await.unwrap();
        assert!(journal.entries().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_by_address() {
        let (_dir, journal) = open_journal();
        assert!(journal.find_by_address("XNUabc").unwrap().is_none());

        journal.begin("XNUother", 1, 1).await.unwrap();
        let entry = journal.begin("XNUabc", 2, 2).await.unwrap();
        assert_eq!(journal.find_by_address("XNUabc").unwrap(), Some(entry.clone()));

        journal.complete(entry.id).await.unwrap();
        assert!(journal.find_by_address("XNUabc").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_only_clears_unresolved_entries() {
        let (_dir, journal) = open_journal();
        let entry = journal.begin("XNUabc", 10, 1).await.unwrap();

        assert!(!journal.resolve(entry.id).await.unwrap());
        assert_eq!(journal.len(), 1);

        journal.mark_unresolved(entry.id).await.unwrap();
        assert!(journal.resolve(entry.id).await.unwrap());
        assert!(journal.is_empty());

        assert!(matches!(journal.resolve(entry.id).await, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unknown_entry() {
        let (_dir, journal) = open_journal();
        assert!(journal.mark_sent(42, "aa", 1).await.is_err());
    }
}
