use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, ThreadId};

use serde_json::Value;
use thiserror::Error;

use super::manager::{TransactionError, TransactionManager, Work};
use crate::error::DispatchError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store lock poisoned during {0}")]
    LockPoisoned(&'static str),
}

impl From<StoreError> for TransactionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::LockPoisoned(op) => TransactionError::LockPoisoned(op),
        }
    }
}

/// Writes staged by one open transaction. `None` marks a delete.
#[derive(Default)]
struct Pending {
    depth: usize,
    writes: HashMap<String, Option<Value>>,
}

/// Transactional in-memory key/value store.
///
/// Transactions are scoped to the calling thread, so concurrent dispatches on
/// different threads each get their own boundary. Writes made inside a
/// transaction are visible to that thread only and are published on commit.
/// A transaction opened while one is already active on the thread joins it.
///
/// Outside a transaction, `put` and `delete` write through immediately.
///
/// ## Example
///
/// ```ignore
/// let store = InMemoryStore::new();
/// let bus = Bus::builder(registry)
///     .transactions(Arc::new(store.clone()))
///     .build();
/// ```
#[derive(Clone, Default)]
pub struct InMemoryStore {
    committed: Arc<RwLock<HashMap<String, Value>>>,
    pending: Arc<Mutex<HashMap<ThreadId, Pending>>>,
    commits: Arc<AtomicU64>,
    rollbacks: Arc<AtomicU64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        {
            let pending = self
                .pending
                .lock()
                .map_err(|_| StoreError::LockPoisoned("get"))?;
            if let Some(staged) = pending
                .get(&thread::current().id())
                .and_then(|p| p.writes.get(key))
            {
                return Ok(staged.clone());
            }
        }

        let committed = self
            .committed
            .read()
            .map_err(|_| StoreError::LockPoisoned("get"))?;
        Ok(committed.get(key).cloned())
    }

    pub fn put(&self, key: impl Into<String>, value: Value) -> Result<(), StoreError> {
        self.write(key.into(), Some(value))
    }

    pub fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.write(key.to_string(), None)
    }

    /// Committed state only.
    pub fn snapshot(&self) -> Result<HashMap<String, Value>, StoreError> {
        let committed = self
            .committed
            .read()
            .map_err(|_| StoreError::LockPoisoned("snapshot"))?;
        Ok(committed.clone())
    }

    /// Whether the calling thread has an open transaction.
    pub fn in_transaction(&self) -> bool {
        self.pending
            .lock()
            .map(|pending| pending.contains_key(&thread::current().id()))
            .unwrap_or(false)
    }

    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> u64 {
        self.rollbacks.load(Ordering::SeqCst)
    }

    fn write(&self, key: String, value: Option<Value>) -> Result<(), StoreError> {
        {
            let mut pending = self
                .pending
                .lock()
                .map_err(|_| StoreError::LockPoisoned("write"))?;
            if let Some(open) = pending.get_mut(&thread::current().id()) {
                open.writes.insert(key, value);
                return Ok(());
            }
        }

        let mut committed = self
            .committed
            .write()
            .map_err(|_| StoreError::LockPoisoned("write"))?;
        apply(&mut committed, key, value);
        Ok(())
    }

    /// Open (or join) the calling thread's transaction. Returns the new depth.
    fn begin(&self) -> Result<usize, StoreError> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| StoreError::LockPoisoned("begin"))?;
        let open = pending.entry(thread::current().id()).or_default();
        open.depth += 1;
        Ok(open.depth)
    }

    /// Leave a joined scope without committing or rolling back.
    fn leave(&self) -> Result<(), StoreError> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| StoreError::LockPoisoned("leave"))?;
        if let Some(open) = pending.get_mut(&thread::current().id()) {
            open.depth -= 1;
        }
        Ok(())
    }

    /// Close the outermost scope, taking its staged writes.
    fn finish(&self) -> Result<HashMap<String, Option<Value>>, StoreError> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| StoreError::LockPoisoned("finish"))?;
        Ok(pending
            .remove(&thread::current().id())
            .map(|open| open.writes)
            .unwrap_or_default())
    }

    fn commit(&self, writes: HashMap<String, Option<Value>>) -> Result<(), StoreError> {
        let mut committed = self
            .committed
            .write()
            .map_err(|_| StoreError::LockPoisoned("commit"))?;
        for (key, value) in writes {
            apply(&mut committed, key, value);
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn apply(committed: &mut HashMap<String, Value>, key: String, value: Option<Value>) {
    match value {
        Some(value) => {
            committed.insert(key, value);
        }
        None => {
            committed.remove(&key);
        }
    }
}

/// One entry into the calling thread's transaction. Dropping it without
/// `close` (the unit of work panicked) leaves a joined scope or discards the
/// outermost one, so the thread never keeps a stale open transaction.
struct Scope<'s> {
    store: &'s InMemoryStore,
    depth: usize,
    open: bool,
}

impl<'s> Scope<'s> {
    fn enter(store: &'s InMemoryStore) -> Result<Self, StoreError> {
        let depth = store.begin()?;
        Ok(Self {
            store,
            depth,
            open: true,
        })
    }

    fn close(mut self, result: Result<Value, DispatchError>) -> Result<Value, DispatchError> {
        self.open = false;

        if self.depth > 1 {
            self.store.leave().map_err(TransactionError::from)?;
            return result;
        }

        let writes = self.store.finish().map_err(TransactionError::from)?;
        match result {
            Ok(value) => {
                self.store.commit(writes).map_err(TransactionError::from)?;
                Ok(value)
            }
            Err(e) => {
                tracing::debug!(discarded = writes.len(), "transaction rolled back");
                self.store.rollbacks.fetch_add(1, Ordering::SeqCst);
                Err(e)
            }
        }
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }

        if self.depth > 1 {
            let _ = self.store.leave();
            return;
        }

        let discarded = self.store.finish().map(|writes| writes.len()).unwrap_or(0);
        tracing::warn!(discarded, "transaction abandoned by a panicking unit of work");
        self.store.rollbacks.fetch_add(1, Ordering::SeqCst);
    }
}

impl TransactionManager for InMemoryStore {
    fn run_in_transaction(&self, work: &mut Work<'_>) -> Result<Value, DispatchError> {
        let scope = Scope::enter(self).map_err(TransactionError::from)?;
        let result = work();
        scope.close(result)
    }
}
