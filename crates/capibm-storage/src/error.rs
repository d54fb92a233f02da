use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("version conflict for {key} (expected {expected}, found {actual})")]
    Conflict {
        key: String,
        expected: String,
        actual: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
