use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

use capibm_core::ObjectKey;
use capibm_storage::{StatusStore, StorageError};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Status persistence for one object, with optimistic concurrency.
///
/// Remembers the store version it last read or wrote and sends it as the
/// precondition of the next write. If somebody else wrote in between, the
/// write fails with [`StorageError::Conflict`] instead of overwriting; the
/// caller re-reads with [`refresh`](Self::refresh) and retries the rest of
/// its pass.
pub struct StatePersistence<S> {
    store: Arc<dyn StatusStore>,
    key: ObjectKey,
    version: Mutex<Option<String>>,
    _status: PhantomData<fn() -> S>,
}

impl<S> StatePersistence<S>
where
    S: Serialize + DeserializeOwned + Default,
{
    pub fn new(store: Arc<dyn StatusStore>, key: ObjectKey) -> Self {
        Self {
            store,
            key,
            version: Mutex::new(None),
            _status: PhantomData,
        }
    }

    pub fn key(&self) -> &ObjectKey {
        &self.key
    }

    /// The version the next write will be conditioned on.
    pub fn version(&self) -> Option<String> {
        self.version
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_version(&self, version: Option<String>) {
        *self.version.lock().unwrap_or_else(PoisonError::into_inner) = version;
    }

    /// Read the stored status, or the default when nothing is stored yet.
    pub async fn load(&self) -> Result<S, StorageError> {
        match self.store.get(&self.key).await? {
            Some(stored) => {
                let status = serde_json::from_value(stored.body)?;
                tracing::debug!(key = %self.key, version = %stored.version, "status loaded");
                self.set_version(Some(stored.version));
                Ok(status)
            }
            None => {
                tracing::debug!(key = %self.key, "no stored status, starting fresh");
                self.set_version(None);
                Ok(S::default())
            }
        }
    }

    /// Re-read after a conflict. Alias of [`load`](Self::load) kept for call-site clarity.
    pub async fn refresh(&self) -> Result<S, StorageError> {
        self.load().await
    }

    /// Write `status`, conditioned on the last seen version.
    pub async fn persist(&self, status: &S) -> Result<(), StorageError> {
        let body = serde_json::to_value(status)?;
        let expected = self.version();
        match self.store.patch(&self.key, body, expected.as_deref()).await {
            Ok(version) => {
                tracing::debug!(key = %self.key, version = %version, "status persisted");
                self.set_version(Some(version));
                Ok(())
            }
            Err(e) => {
                if e.is_conflict() {
                    tracing::warn!(key = %self.key, error = %e, "status changed since it was read");
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use capibm_core::{ObservedStatus, ResourceKind};
    use capibm_storage::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn persist_tracks_version_across_writes() {
        let store = Arc::new(MemoryStore::new());
        let key = ObjectKey::new("default", "demo");
        let persistence = StatePersistence::<ObservedStatus>::new(store.clone(), key.clone());

        let mut status = persistence.load().await.unwrap();
        assert!(status.is_empty());

        status.record(ResourceKind::Vpc, "r006-1", "demo-vpc");
        persistence.persist(&status).await.unwrap();
        status.record(ResourceKind::Subnet, "0717-1", "demo-subnet");
        persistence.persist(&status).await.unwrap();

        assert_eq!(persistence.version().as_deref(), Some("2"));
        assert_eq!(store.generation(&key).await, 2);
    }

    #[tokio::test]
    async fn concurrent_writer_causes_conflict_until_refresh() {
        let store = Arc::new(MemoryStore::new());
        let key = ObjectKey::new("default", "demo");
        let ours = StatePersistence::<ObservedStatus>::new(store.clone(), key.clone());
        let theirs = StatePersistence::<ObservedStatus>::new(store.clone(), key.clone());

        let mut status = ours.load().await.unwrap();
        let mut other = theirs.load().await.unwrap();
        other.record(ResourceKind::Vpc, "r006-theirs", "demo-vpc");
        theirs.persist(&other).await.unwrap();

        status.record(ResourceKind::Vpc, "r006-ours", "demo-vpc");
        let err = ours.persist(&status).await.unwrap_err();
        assert!(err.is_conflict());

        let fresh = ours.refresh().await.unwrap();
        assert_eq!(fresh.vpc.as_deref(), Some("r006-theirs"));
        ours.persist(&fresh).await.unwrap();
    }
}
