//! Cooldown ledger: the last successful claim time of every address.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::Tree;
use std::path::Path;
use tracing::debug;

/// Last successful claim of one address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub address: String,
    /// Unix milliseconds
    pub last_claim_at: i64,
}

impl ClaimRecord {
    /// True while fewer than `window_ms` milliseconds have elapsed since the
    /// last claim. A timestamp ahead of `now_ms` counts as on cooldown.
    pub fn is_on_cooldown(&self, now_ms: i64, window_ms: i64) -> bool {
        now_ms - self.last_claim_at < window_ms
    }

    /// Unix milliseconds at which the address may claim again
    pub fn next_eligible_at(&self, window_ms: i64) -> i64 {
        self.last_claim_at.saturating_add(window_ms)
    }

    pub fn last_claim_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_claim_at).unwrap_or_default()
    }
}

/// Result of [`CooldownLedger::record_claim`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimWrite {
    Created,
    Updated,
}

/// Address-keyed claim records. The address is the tree key, so there is at
/// most one record per address.
pub struct CooldownLedger {
    db: sled::Db,
    claims: Tree,
}

impl CooldownLedger {
    /// Open (or create) the ledger at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::Config::default()
            .path(path.as_ref())
            .cache_capacity(16 * 1024 * 1024)
            .open()?;
        let claims = db.open_tree("claims")?;
        Ok(Self { db, claims })
    }

    pub fn find_by_address(&self, address: &str) -> Result<Option<ClaimRecord>> {
        match self.claims.get(address.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn is_on_cooldown(&self, address: &str, now_ms: i64, window_ms: i64) -> Result<bool> {
        Ok(self
            .find_by_address(address)?
            .map(|record| record.is_on_cooldown(now_ms, window_ms))
            .unwrap_or(false))
    }

    /// Create the record or move `last_claim_at` forward to `at_ms`.
    /// An older timestamp never overwrites a newer one.
    pub fn record_claim(&self, address: &str, at_ms: i64) -> Result<ClaimWrite> {
        let mut encode_error = None;

        let previous = self.claims.fetch_and_update(address.as_bytes(), |old| {
            let last_claim_at = old
                .and_then(|bytes| bincode::deserialize::<ClaimRecord>(bytes).ok())
                .map(|record| record.last_claim_at.max(at_ms))
                .unwrap_or(at_ms);
            let record = ClaimRecord {
                address: address.to_string(),
                last_claim_at,
            };
            match bincode::serialize(&record) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    encode_error = Some(e);
                    old.map(|bytes| bytes.to_vec())
                }
            }
        })?;

        if let Some(e) = encode_error {
            return Err(e.into());
        }

        let write = if previous.is_some() {
            ClaimWrite::Updated
        } else {
            ClaimWrite::Created
        };
        debug!("Claim record for {} {:?}", address, write);
        Ok(write)
    }

    /// All records, ordered by address
    pub fn list(&self) -> Result<Vec<ClaimRecord>> {
        let mut records = Vec::with_capacity(self.claims.len());
        for item in self.claims.iter() {
            let (_, value) = item?;
            records.push(bincode::deserialize(&value)?);
        }
        Ok(records)
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    pub async fn flush(&self) -> Result<()> {
        self.db.flush_async().await?;
        Ok(())
    }
}
