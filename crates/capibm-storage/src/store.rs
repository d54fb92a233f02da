use std::future::Future;
use std::pin::Pin;

use capibm_core::ObjectKey;

use crate::error::StorageError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A stored status body and the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Stored {
    pub version: String,
    pub body: serde_json::Value,
}

/// The external object store, reduced to what status persistence needs.
///
/// Methods return boxed futures for dyn compatibility.
pub trait StatusStore: Send + Sync {
    /// Read the current body. `Ok(None)` if nothing has been written yet.
    fn get<'a>(
        &'a self,
        key: &'a ObjectKey,
    ) -> BoxFuture<'a, Result<Option<Stored>, StorageError>>;

    /// Replace the body if the stored version still equals `expected`.
    ///
    /// `expected = None` means the object must not exist yet. Returns the
    /// new version, or `StorageError::Conflict` if the precondition failed.
    fn patch<'a>(
        &'a self,
        key: &'a ObjectKey,
        body: serde_json::Value,
        expected: Option<&'a str>,
    ) -> BoxFuture<'a, Result<String, StorageError>>;
}

/// Shared precondition check used by the bundled stores.
pub(crate) fn check_version(
    key: &ObjectKey,
    current: Option<&str>,
    expected: Option<&str>,
) -> Result<(), StorageError> {
    if current == expected {
        return Ok(());
    }
    Err(StorageError::Conflict {
        key: key.to_string(),
        expected: expected.unwrap_or("<absent>").to_string(),
        actual: current.unwrap_or("<absent>").to_string(),
    })
}
