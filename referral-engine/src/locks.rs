use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Async mutexes keyed by event id.
///
/// Holders of different keys never wait on each other. Entries are dropped
/// from the map once the last holder or waiter for a key is gone.
#[derive(Debug, Default)]
pub struct EventLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

pub struct EventGuard<'a> {
    owner: &'a EventLocks,
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl EventLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: &str) -> EventGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // a waiter cancelled before taking its lock leaves an entry only the map holds
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(key.to_owned())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let guard = lock.lock_owned().await;
        EventGuard {
            owner: self,
            key: key.to_owned(),
            _guard: guard,
        }
    }

    /// Keys in the map, including ones left idle by cancelled waiters
    /// until the next `acquire`.
    pub fn active_keys(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for EventGuard<'_> {
    fn drop(&mut self) {
        let mut locks = self
            .owner
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // the map and this guard hold the only references: nobody is waiting
        let idle = locks
            .get(&self.key)
            .map_or(false, |lock| Arc::strong_count(lock) <= 2);
        if idle {
            locks.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn releases_keys_after_use() {
        let locks = EventLocks::new();
        {
            let _first = locks.acquire("round-1").await;
            let _other = locks.acquire("round-2").await;
            assert_eq!(locks.active_keys(), 2);
        }
        assert_eq!(locks.active_keys(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn serialises_same_key() {
        let locks = Arc::new(EventLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let overlaps = overlaps.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("trade-42").await;
                if inside.fetch_add(1, Ordering::SeqCst) > 0 {
                    overlaps.fetch_add(1, Ordering::SeqCst);
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
        assert_eq!(locks.active_keys(), 0);
    }

    #[tokio::test]
    async fn reclaims_keys_of_cancelled_waiters() {
        let locks = EventLocks::new();
        let holder = locks.acquire("round-7").await;
        let mut waiter = Box::pin(locks.acquire("round-7"));
        assert!(tokio::time::timeout(Duration::from_millis(5), &mut waiter)
            .await
            .is_err());

        // released while a waiter was queued, then the waiter gives up
        drop(holder);
        drop(waiter);
        assert_eq!(locks.active_keys(), 1);

        drop(locks.acquire("round-8").await);
        assert_eq!(locks.active_keys(), 0);
    }
}
