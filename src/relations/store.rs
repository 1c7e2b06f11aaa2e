//! Resource cache and in-flight fetch tracking
//!
//! One `TreeStore` belongs to one `TreeBuilder`. Entries are created on first
//! fetch and overwritten on refresh; they are never removed.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

use crate::models::Resource;
use crate::relations::NodeKey;

#[derive(Debug, Default)]
pub struct TreeStore {
    cache: Mutex<HashMap<NodeKey, Resource>>,
    in_flight: Mutex<HashSet<NodeKey>>,
    released: Notify,
}

impl TreeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<NodeKey, Resource>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn in_flight(&self) -> MutexGuard<'_, HashSet<NodeKey>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &NodeKey) -> Option<Resource> {
        self.cache().get(key).cloned()
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.cache().contains_key(key)
    }

    pub fn insert(&self, key: NodeKey, resource: Resource) {
        self.cache().insert(key, resource);
    }

    pub fn len(&self) -> usize {
        self.cache().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache().is_empty()
    }

    pub fn is_in_flight(&self, key: &NodeKey) -> bool {
        self.in_flight().contains(key)
    }

    /// Claim `key` for a fetch.
    ///
    /// The check and insert happen under one lock with no await in between.
    /// Returns `None` when another operation already holds the key. The key is
    /// released when the returned guard drops, on success and failure alike.
    pub fn try_begin(self: &Arc<Self>, key: &NodeKey) -> Option<InFlightGuard> {
        if !self.in_flight().insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard {
            store: Arc::clone(self),
            key: key.clone(),
        })
    }

    /// Wait until no fetch holds `key`
    pub async fn wait_until_idle(&self, key: &NodeKey) {
        loop {
            let notified = self.released.notified();
            tokio::pin!(notified);
            // Register before checking so a release in between is not missed
            notified.as_mut().enable();
            if !self.is_in_flight(key) {
                return;
            }
            notified.await;
        }
    }
}

/// Marks a key as being fetched for as long as it lives
#[derive(Debug)]
pub struct InFlightGuard {
    store: Arc<TreeStore>,
    key: NodeKey,
}

impl InFlightGuard {
    pub fn key(&self) -> &NodeKey {
        &self.key
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.store.in_flight().remove(&self.key);
        self.store.released.notify_waiters();
    }
}
