//! Durable key-value persistence for the catalog layer.
//!
//! Exactly two named records exist: the last successfully fetched catalog
//! snapshot and the set of favorited product ids. Each record is read and
//! written wholesale, never merged or patched. There is no schema
//! versioning; a corrupt record is simply treated as absent.

mod storage;
mod traits;

pub use storage::{MemoryStore, SqliteStore};
pub use traits::{PersistentStore, Snapshot, StoreError};
