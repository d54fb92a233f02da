use std::collections::HashMap;

use capibm_core::ObjectKey;
use tokio::sync::Mutex;

use crate::error::StorageError;
use crate::store::{BoxFuture, StatusStore, Stored, check_version};

/// Process-local store. Versions are a per-key write counter.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<ObjectKey, (u64, serde_json::Value)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes to `key`.
    pub async fn generation(&self, key: &ObjectKey) -> u64 {
        self.objects
            .lock()
            .await
            .get(key)
            .map(|(generation, _)| *generation)
            .unwrap_or(0)
    }
}

impl StatusStore for MemoryStore {
    fn get<'a>(
        &'a self,
        key: &'a ObjectKey,
    ) -> BoxFuture<'a, Result<Option<Stored>, StorageError>> {
        Box::pin(async move {
            let objects = self.objects.lock().await;
            Ok(objects.get(key).map(|(generation, body)| Stored {
                version: generation.to_string(),
                body: body.clone(),
            }))
        })
    }

    fn patch<'a>(
        &'a self,
        key: &'a ObjectKey,
        body: serde_json::Value,
        expected: Option<&'a str>,
    ) -> BoxFuture<'a, Result<String, StorageError>> {
        Box::pin(async move {
            let mut objects = self.objects.lock().await;
            let current = objects.get(key).map(|(generation, _)| generation.to_string());
            check_version(key, current.as_deref(), expected)?;

            let next = objects.get(key).map(|(generation, _)| generation + 1).unwrap_or(1);
            objects.insert(key.clone(), (next, body));
            tracing::debug!(key = %key, version = next, "status patched in memory");
            Ok(next.to_string())
        })
    }
}
