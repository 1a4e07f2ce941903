//! Per-address serialization of claims

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

/// Keyed async mutex. Claims for one address run one at a time, claims for
/// different addresses do not wait on each other. Map entries are dropped
/// once nobody holds or waits for them.
#[derive(Clone, Default)]
pub struct AddressLocks {
    locks: Arc<Mutex<LockMap>>,
}

/// Held for the duration of one claim
pub struct AddressGuard {
    address: String,
    lock: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<Mutex<LockMap>>,
}

impl AddressLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, address: &str) -> AddressGuard {
        let lock = lock_map(&self.locks)
            .entry(address.to_string())
            .or_default()
            .clone();
        let guard = lock.clone().lock_owned().await;

        AddressGuard {
            address: address.to_string(),
            lock,
            guard: Some(guard),
            locks: self.locks.clone(),
        }
    }

    /// Addresses with a holder or a waiter
    pub fn len(&self) -> usize {
        lock_map(&self.locks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for AddressGuard {
    fn drop(&mut self) {
        self.guard.take();

        let mut map = lock_map(&self.locks);
        // One reference in the map, one here: nobody else is waiting
        if Arc::strong_count(&self.lock) == 2 {
            if let Some(existing) = map.get(&self.address) {
                if Arc::ptr_eq(existing, &self.lock) {
                    map.remove(&self.address);
                }
            }
        }
    }
}

fn lock_map(locks: &Mutex<LockMap>) -> MutexGuard<'_, LockMap> {
    locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_address_is_serialized() {
        let locks = AddressLocks::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_inside = max_inside.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("XNUsame").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_addresses_do_not_block() {
        let locks = AddressLocks::new();
        let _a = locks.acquire("XNUa").await;
        let b = tokio::time::timeout(Duration::from_secs(1), locks.acquire("XNUb")).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let locks = AddressLocks::new();
        {
            let _guard = locks.acquire("XNUa").await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }
}
