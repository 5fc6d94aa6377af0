//! Collapse concurrent identical calls into one execution
//!
//! The first caller for a key becomes the leader and runs the work on a
//! spawned task; callers arriving while it is in flight subscribe to the same
//! result. A caller that stops waiting (its future is dropped) does not
//! cancel the work for the others.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{CorralError, Result};

pub struct SingleFlight<K, T>
where
    K: Eq + Hash,
{
    calls: Arc<DashMap<K, broadcast::Sender<T>>>,
}

impl<K, T> Clone for SingleFlight<K, T>
where
    K: Eq + Hash,
{
    fn clone(&self) -> Self {
        Self {
            calls: Arc::clone(&self.calls),
        }
    }
}

impl<K, T> Default for SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Releases the key when the leader task finishes or unwinds
struct InFlightGuard<K, T>
where
    K: Eq + Hash,
{
    calls: Arc<DashMap<K, broadcast::Sender<T>>>,
    key: K,
    sender: broadcast::Sender<T>,
}

impl<K, T> Drop for InFlightGuard<K, T>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        self.calls
            .remove_if(&self.key, |_, sender| sender.same_channel(&self.sender));
    }
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            calls: Arc::new(DashMap::new()),
        }
    }

    /// Number of keys with a call in flight
    pub fn in_flight(&self) -> usize {
        self.calls.len()
    }

    /// Run `work` unless a call for `key` is already in flight, in which case
    /// wait for and share its result
    pub async fn run<F, Fut>(&self, key: K, work: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let leader = match self.calls.entry(key.clone()) {
            Entry::Occupied(entry) => {
                debug!("Joining in-flight call");
                Err(entry.get().subscribe())
            }
            Entry::Vacant(entry) => {
                let (sender, receiver) = broadcast::channel(1);
                entry.insert(sender.clone());
                Ok((sender, receiver))
            }
        };

        let mut receiver = match leader {
            Err(receiver) => receiver,
            Ok((sender, receiver)) => {
                let guard = InFlightGuard {
                    calls: Arc::clone(&self.calls),
                    key,
                    sender: sender.clone(),
                };
                let fut = work();
                tokio::spawn(async move {
                    let value = fut.await;
                    // Later callers must start a fresh call once the result is out.
                    drop(guard);
                    let _ = sender.send(value);
                });
                receiver
            }
        };

        receiver
            .recv()
            .await
            .map_err(|e| CorralError::internal_error(format!("in-flight call ended without a result: {}", e)))
    }
}
