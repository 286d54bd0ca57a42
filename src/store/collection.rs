use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{Record, RecordStore};
use crate::errors::{ServiceError, StoreError};

type Records<T> = IndexMap<Uuid, T>;

/// The authoritative in-memory copy of one collection, mirrored to a
/// [`RecordStore`].
///
/// Reads share the lock. A mutation holds the write lock for the whole
/// read-modify-write-persist cycle and works on a draft copy, which only
/// replaces the live map after the store has accepted it. Two concurrent
/// mutations therefore never observe each other's intermediate state, and
/// a failed persist leaves memory exactly as the store still has it.
///
/// A persist that outlives the timeout is reported as
/// [`StoreError::Timeout`] right away, but the write lock stays held until
/// the write settles. If it landed after all, the previous state is written
/// back so the store ends up agreeing with what the caller was told.
pub struct Collection<T: Record> {
    store: Arc<dyn RecordStore<T>>,
    records: Arc<RwLock<Records<T>>>,
    persist_timeout: Duration,
}

impl<T: Record> Collection<T> {
    pub async fn load(store: Arc<dyn RecordStore<T>>, persist_timeout: Duration) -> Self {
        let records = index(store.load_all().await);

        info!(
            collection = T::COLLECTION,
            count = records.len(),
            "Loaded collection"
        );

        Self {
            store,
            records: Arc::new(RwLock::new(records)),
            persist_timeout,
        }
    }

    pub async fn get(&self, id: Uuid) -> Option<T> {
        self.records.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Snapshot of every record in stored order.
    pub async fn all(&self) -> Vec<T> {
        self.records.read().await.values().cloned().collect()
    }

    /// Runs `f` against the live map under a shared lock.
    pub async fn read<R>(&self, f: impl FnOnce(&Records<T>) -> R) -> R {
        let guard = self.records.read().await;
        f(&guard)
    }

    /// Serialised read-modify-write. If `f` fails nothing is persisted; if
    /// the persist fails or times out the live map is left unchanged.
    pub async fn mutate<R, F>(&self, f: F) -> Result<R, ServiceError>
    where
        F: FnOnce(&mut Records<T>) -> Result<R, ServiceError>,
    {
        let mut guard = Arc::clone(&self.records).write_owned().await;
        let mut draft = guard.clone();
        let outcome = f(&mut draft)?;

        let snapshot: Vec<T> = draft.values().cloned().collect();
        let store = Arc::clone(&self.store);
        let mut write = tokio::spawn(async move { store.persist(&snapshot).await });

        let persisted = match tokio::time::timeout(self.persist_timeout, &mut write).await {
            Ok(joined) => settled(joined),
            Err(_) => {
                warn!(
                    collection = T::COLLECTION,
                    timeout = ?self.persist_timeout,
                    "Persist timed out; holding the collection until the write settles"
                );
                tokio::spawn(roll_back_if_landed(Arc::clone(&self.store), guard, write));
                return Err(StoreError::Timeout(self.persist_timeout).into());
            }
        };

        if let Err(err) = persisted {
            error!(
                collection = T::COLLECTION,
                error = %err,
                "Persist failed; discarding in-memory change"
            );
            return Err(err.into());
        }

        *guard = draft;
        Ok(outcome)
    }
}

fn index<T: Record>(loaded: Vec<T>) -> Records<T> {
    let mut records = IndexMap::with_capacity(loaded.len());
    for record in loaded {
        let id = record.id();
        if records.insert(id, record).is_some() {
            warn!(
                collection = T::COLLECTION,
                %id,
                "Duplicate record id in store; keeping the last occurrence"
            );
        }
    }
    records
}

fn settled(joined: Result<Result<(), StoreError>, JoinError>) -> Result<(), StoreError> {
    joined?
}

/// Waits out a timed-out write while still owning the write lock. `guard`
/// holds the state from before the abandoned mutation.
async fn roll_back_if_landed<T: Record>(
    store: Arc<dyn RecordStore<T>>,
    mut guard: OwnedRwLockWriteGuard<Records<T>>,
    write: JoinHandle<Result<(), StoreError>>,
) {
    if let Err(err) = settled(write.await) {
        info!(
            collection = T::COLLECTION,
            error = %err,
            "Timed-out write did not land"
        );
        return;
    }

    let previous: Vec<T> = guard.values().cloned().collect();
    match store.persist(&previous).await {
        Ok(()) => warn!(
            collection = T::COLLECTION,
            "Timed-out write landed late; restored the previous state"
        ),
        Err(err) => {
            error!(
                collection = T::COLLECTION,
                error = %err,
                "Failed to restore the previous state; reloading from the store"
            );
            *guard = index(store.load_all().await);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory store that counts writes and can be told to fail or to
    /// take a while.
    pub struct MemoryStore<T> {
        pub records: Mutex<Vec<T>>,
        pub writes: AtomicUsize,
        pub fail: AtomicBool,
        pub delay_ms: AtomicU64,
    }

    impl<T> MemoryStore<T> {
        pub fn new(records: Vec<T>) -> Self {
            Self {
                records: Mutex::new(records),
                writes: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                delay_ms: AtomicU64::new(0),
            }
        }

        pub fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        pub fn stored(&self) -> Vec<T>
        where
            T: Clone,
        {
            self.records.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl<T: Record> RecordStore<T> for MemoryStore<T> {
        async fn load_all(&self) -> Vec<T> {
            self.stored()
        }

        async fn persist(&self, records: &[T]) -> Result<(), StoreError> {
            let delay = self.delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreError::io(
                    "memory",
                    std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                ));
            }
            *self.records.lock().unwrap() = records.to_vec();
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
