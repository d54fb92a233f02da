//! capibm-storage
//!
//! The status store boundary. Status objects are stored as JSON values
//! keyed by [`ObjectKey`](capibm_core::ObjectKey) and written with an
//! optimistic-concurrency precondition on the version last read.

pub mod error;
pub mod file;
pub mod memory;
pub mod store;

pub use crate::error::StorageError;
pub use crate::file::FileStore;
pub use crate::memory::MemoryStore;
pub use crate::store::{BoxFuture, StatusStore, Stored};
