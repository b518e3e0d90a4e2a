//! In-process store for tests and demos.
//!
//! Sets live in a `HashMap` behind a single async mutex, so a batch is
//! applied under one lock acquisition and is atomic with respect to other
//! callers. Two faults can be injected:
//! - [`MemoryStore::set_offline`]: every call fails before touching data
//! - [`MemoryStore::reject_key`]: commands reading or writing the key as a
//!   set are rejected at execution time, the way Redis answers WRONGTYPE,
//!   while the rest of the batch (including any `Delete`) still applies

use crate::store::{Batch, Command, Reply, SetStore, StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct Inner {
    sets: HashMap<String, BTreeSet<String>>,
    rejected: HashSet<String>,
}

/// A [`SetStore`] holding sets in memory.
///
/// Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    offline: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Reject set commands touching `key` until [`MemoryStore::accept_key`] is called.
    pub async fn reject_key(&self, key: impl Into<String>) {
        self.inner.lock().await.rejected.insert(key.into());
    }

    pub async fn accept_key(&self, key: &str) {
        self.inner.lock().await.rejected.remove(key);
    }

    /// Number of store calls (`exec`, `set_members`, `delete`) made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn contains_key(&self, key: &str) -> bool {
        self.inner.lock().await.sets.contains_key(key)
    }

    /// All keys currently holding a set, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        let mut keys: Vec<String> = inner.sets.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn begin_call(&self) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }
}

impl Inner {
    fn apply(&mut self, command: Command) -> Reply {
        match command {
            Command::SetAdd { key, member } => {
                let added = self.sets.entry(key).or_default().insert(member);
                Reply::Count(u64::from(added))
            }
            Command::SetUnionStore {
                destination,
                sources,
            } => {
                let union: BTreeSet<String> = sources
                    .iter()
                    .filter_map(|source| self.sets.get(source))
                    .flatten()
                    .cloned()
                    .collect();
                let count = union.len() as u64;
                if union.is_empty() {
                    self.sets.remove(&destination);
                } else {
                    self.sets.insert(destination, union);
                }
                Reply::Count(count)
            }
            Command::Delete { key } => Reply::Count(u64::from(self.sets.remove(&key).is_some())),
            Command::SetMembers { key } => Reply::Members(
                self.sets
                    .get(&key)
                    .map(|members| members.iter().cloned().collect())
                    .unwrap_or_default(),
            ),
        }
    }

    /// `Delete` is never rejected: like Redis `DEL`, it works on a key of any type.
    fn is_rejected(&self, command: &Command) -> Option<String> {
        if matches!(command, Command::Delete { .. }) {
            return None;
        }
        command
            .keys()
            .into_iter()
            .find(|key| self.rejected.contains(*key))
            .map(|key| format!("WRONGTYPE Operation against key '{key}'"))
    }
}

#[async_trait]
impl SetStore for MemoryStore {
    async fn exec(&self, batch: Batch) -> StoreResult<Vec<Reply>> {
        self.begin_call()?;

        let mut inner = self.inner.lock().await;
        let mut replies = Vec::with_capacity(batch.len());
        let mut first_rejection = None;

        for (index, command) in batch.into_commands().into_iter().enumerate() {
            if let Some(reason) = inner.is_rejected(&command) {
                first_rejection.get_or_insert(StoreError::CommandRejected { index, reason });
                continue;
            }
            replies.push(inner.apply(command));
        }

        match first_rejection {
            Some(err) => Err(err),
            None => Ok(replies),
        }
    }

    async fn set_members(&self, key: &str) -> StoreResult<Vec<String>> {
        self.begin_call()?;
        let inner = self.inner.lock().await;
        Ok(inner
            .sets
            .get(key)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete(&self, key: &str) -> StoreResult<u64> {
        self.begin_call()?;
        let mut inner = self.inner.lock().await;
        Ok(u64::from(inner.sets.remove(key).is_some()))
    }
}
