//! Keyed one-shot waiters with exactly-once resolution.
//!
//! A [`PendingTable`] maps a key to at most one waiting caller. Every exit
//! path (delivery, deadline, cancellation, shutdown) goes through removal
//! of the table entry under the same lock, so whichever path removes the
//! entry first decides the outcome and the others become no-ops.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;

/// A key already has a waiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("a waiter is already registered for this key")]
pub struct RegisterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WaitError {
    #[error("deadline elapsed")]
    Timeout,

    #[error("waiter cancelled")]
    Cancelled,
}

struct Entry<V> {
    id: u64,
    tx: oneshot::Sender<V>,
}

struct Inner<K, V> {
    next_id: u64,
    entries: HashMap<K, Entry<V>>,
}

/// Thread-safe table of pending waiters keyed by `K`.
pub struct PendingTable<K, V> {
    inner: Arc<Mutex<Inner<K, V>>>,
}

impl<K, V> Clone for PendingTable<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Default for PendingTable<K, V> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_id: 0,
                entries: HashMap::new(),
            })),
        }
    }
}

impl<K, V> PendingTable<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        // Entries stay consistent even if a holder panicked; keep serving.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a waiter for `key`. Fails if one is already waiting.
    ///
    /// The returned guard removes its entry when dropped, so a caller that
    /// abandons the wait never leaks the registration.
    pub fn register(&self, key: K) -> Result<PendingGuard<K, V>, RegisterError> {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.lock();
        if inner.entries.contains_key(&key) {
            return Err(RegisterError);
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.entries.insert(key.clone(), Entry { id, tx });
        drop(inner);

        Ok(PendingGuard {
            table: self.clone(),
            key,
            id,
            rx,
        })
    }

    /// Resolve the waiter for `key` with `value`.
    ///
    /// Returns `false` when nobody is waiting (late or unsolicited reply).
    pub fn resolve(&self, key: &K, value: V) -> bool {
        let mut inner = self.lock();
        match inner.entries.remove(key) {
            // Sent under the lock so a racing deadline sees the value.
            Some(entry) => entry.tx.send(value).is_ok(),
            None => false,
        }
    }

    /// Whether a waiter is registered for `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Drop every waiter; each observes [`WaitError::Cancelled`].
    pub fn cancel_all(&self) -> usize {
        let mut inner = self.lock();
        let count = inner.entries.len();
        inner.entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove `key` only if it still holds the entry registered as `id`.
    fn remove_entry(&self, key: &K, id: u64) -> bool {
        let mut inner = self.lock();
        if inner.entries.get(key).is_some_and(|entry| entry.id == id) {
            inner.entries.remove(key);
            true
        } else {
            false
        }
    }
}

/// A registered waiter. Dropping it withdraws the registration.
pub struct PendingGuard<K, V>
where
    K: Eq + Hash + Clone,
{
    table: PendingTable<K, V>,
    key: K,
    id: u64,
    rx: oneshot::Receiver<V>,
}

impl<K, V> PendingGuard<K, V>
where
    K: Eq + Hash + Clone,
{
    pub const fn key(&self) -> &K {
        &self.key
    }

    /// Wait for the value until `deadline` elapses.
    pub async fn wait(mut self, deadline: Duration) -> Result<V, WaitError> {
        match tokio::time::timeout(deadline, &mut self.rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(WaitError::Cancelled),
            Err(_) => {
                if self.table.remove_entry(&self.key, self.id) {
                    return Err(WaitError::Timeout);
                }
                // Someone else removed the entry first: a delivery already
                // sent its value, or shutdown dropped the sender.
                match self.rx.try_recv() {
                    Ok(value) => Ok(value),
                    Err(_) => Err(WaitError::Cancelled),
                }
            }
        }
    }
}

impl<K, V> Drop for PendingGuard<K, V>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        self.table.remove_entry(&self.key, self.id);
    }
}
