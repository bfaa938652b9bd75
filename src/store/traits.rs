//! Core trait and record types for the persistence layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::catalog::types::Product;

/// The last successfully fetched full catalog, persisted wholesale.
///
/// At most one snapshot exists at a time; a new successful fetch replaces it
/// in full. `fetched_at` records when the snapshot was taken so degraded
/// (cache-origin) results can report their age.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
  pub products: Vec<Product>,
  pub fetched_at: DateTime<Utc>,
}

/// Failure writing or opening a record store.
///
/// Write failures degrade durability, not the data already in memory:
/// callers log them and keep going.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("storage unavailable: {0}")]
  Unavailable(String),

  #[error(transparent)]
  Sqlite(#[from] rusqlite::Error),

  #[error("failed to encode record: {0}")]
  Encode(#[from] serde_json::Error),
}

/// Durable key-value persistence for the two catalog records: the last-known
/// catalog snapshot and the favorited product ids.
///
/// Each operation is independently atomic at the record level (single-key
/// overwrite semantics). Reads never fail: a missing or corrupt record is
/// reported as absent and the underlying error is logged as a recoverable
/// event. Writes report failure to the caller instead of raising it.
///
/// The store has no network awareness and never calls back into the layer
/// above it.
pub trait PersistentStore: Send + Sync {
  /// Read the catalog snapshot, or `None` if the record is missing or
  /// unreadable.
  fn read_snapshot(&self) -> Option<Snapshot>;

  /// Serialize and durably overwrite the single snapshot record.
  fn write_snapshot(&self, products: &[Product]) -> Result<(), StoreError>;

  /// Read the favorited product ids; empty if the record is missing or
  /// unreadable.
  fn read_favorite_ids(&self) -> HashSet<u64>;

  /// Overwrite the favorites record in full (never incremental).
  fn write_favorite_ids(&self, ids: &HashSet<u64>) -> Result<(), StoreError>;
}
