use std::path::{Path, PathBuf};

use capibm_core::ObjectKey;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::StorageError;
use crate::store::{BoxFuture, StatusStore, Stored, check_version};

/// One JSON file per object under `<root>/<namespace>/<name>.json`.
///
/// Writes go to a temp file that is renamed over the target, so a reader
/// never sees a half-written status. The write lock serializes
/// compare-and-swap within this process only.
pub struct FileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    generation: u64,
    status: serde_json::Value,
}

impl FileStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    fn path(&self, key: &ObjectKey) -> PathBuf {
        self.root
            .join(&key.namespace)
            .join(format!("{}.json", key.name))
    }

    async fn read(&self, key: &ObjectKey) -> Result<Option<Envelope>, StorageError> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl StatusStore for FileStore {
    fn get<'a>(
        &'a self,
        key: &'a ObjectKey,
    ) -> BoxFuture<'a, Result<Option<Stored>, StorageError>> {
        Box::pin(async move {
            Ok(self.read(key).await?.map(|env| Stored {
                version: env.generation.to_string(),
                body: env.status,
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
            let _guard = self.write_lock.lock().await;

            let current = self.read(key).await?.map(|env| env.generation);
            let current_version = current.map(|g| g.to_string());
            check_version(key, current_version.as_deref(), expected)?;

            let envelope = Envelope {
                generation: current.unwrap_or(0) + 1,
                status: body,
            };
            let json = serde_json::to_vec_pretty(&envelope)?;

            let path = self.path(key);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let tmp_path = path.with_extension("json.tmp");
            tokio::fs::write(&tmp_path, &json).await?;
            tokio::fs::rename(&tmp_path, &path).await?;

            tracing::debug!(
                path = %path.display(),
                generation = envelope.generation,
                "status flushed to disk"
            );
            Ok(envelope.generation.to_string())
        })
    }
}
