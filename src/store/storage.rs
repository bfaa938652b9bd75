//! Record store backends: durable SQLite and volatile in-memory.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

use crate::catalog::types::Product;

use super::traits::{PersistentStore, Snapshot, StoreError};

/// Record key for the catalog snapshot
const SNAPSHOT_KEY: &str = "catalog_snapshot";
/// Record key for the favorited product ids
const FAVORITES_KEY: &str = "favorite_ids";

/// Schema for the record table. One row per named record; `INSERT OR
/// REPLACE` gives each write single-key overwrite atomicity.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    key TEXT PRIMARY KEY,
    data BLOB NOT NULL,
    written_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// SQLite-backed record store.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open or create the store at the default location.
  pub fn open() -> Result<Self, StoreError> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open or create the store at a specific path.
  pub fn open_at(path: &Path) -> Result<Self, StoreError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent).map_err(|e| {
          StoreError::Unavailable(format!(
            "failed to create store directory {}: {}",
            parent.display(),
            e
          ))
        })?;
      }
    }

    Self::from_connection(Connection::open(path)?)
  }

  /// Open a throwaway store that lives only in memory.
  pub fn in_memory() -> Result<Self, StoreError> {
    Self::from_connection(Connection::open_in_memory()?)
  }

  fn from_connection(conn: Connection) -> Result<Self, StoreError> {
    conn.execute_batch(SCHEMA)?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  /// Default database path, `<data_dir>/shopcache/catalog.db`.
  fn default_path() -> Result<PathBuf, StoreError> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| StoreError::Unavailable("could not determine data directory".into()))?;

    Ok(data_dir.join("shopcache").join("catalog.db"))
  }

  /// Read and decode a record. Any failure is logged and reported as
  /// absent; a corrupt record is indistinguishable from a missing one.
  fn read_record<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let conn = match self.conn.lock() {
      Ok(conn) => conn,
      Err(e) => {
        warn!("record store lock poisoned, treating '{key}' as absent: {e}");
        return None;
      }
    };

    let data: Option<Vec<u8>> = match conn
      .query_row("SELECT data FROM records WHERE key = ?", params![key], |row| {
        row.get(0)
      })
      .optional()
    {
      Ok(data) => data,
      Err(e) => {
        warn!("failed to read record '{key}', treating as absent: {e}");
        return None;
      }
    };

    let data = data?;
    match serde_json::from_slice(&data) {
      Ok(value) => Some(value),
      Err(e) => {
        warn!("record '{key}' is corrupt, treating as absent: {e}");
        None
      }
    }
  }

  /// Encode and overwrite a record in a single statement.
  fn write_record<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
    let data = serde_json::to_vec(value)?;

    let conn = self
      .conn
      .lock()
      .map_err(|e| StoreError::Unavailable(format!("record store lock poisoned: {e}")))?;

    conn.execute(
      "INSERT OR REPLACE INTO records (key, data, written_at) VALUES (?, ?, datetime('now'))",
      params![key, data],
    )?;

    Ok(())
  }

  #[cfg(test)]
  fn put_raw(&self, key: &str, data: &[u8]) {
    let conn = self.conn.lock().unwrap();
    conn
      .execute(
        "INSERT OR REPLACE INTO records (key, data) VALUES (?, ?)",
        params![key, data],
      )
      .unwrap();
  }
}

impl PersistentStore for SqliteStore {
  fn read_snapshot(&self) -> Option<Snapshot> {
    self.read_record(SNAPSHOT_KEY)
  }

  fn write_snapshot(&self, products: &[Product]) -> Result<(), StoreError> {
    let snapshot = Snapshot {
      products: products.to_vec(),
      fetched_at: Utc::now(),
    };
    self.write_record(SNAPSHOT_KEY, &snapshot)
  }

  fn read_favorite_ids(&self) -> HashSet<u64> {
    self.read_record(FAVORITES_KEY).unwrap_or_default()
  }

  fn write_favorite_ids(&self, ids: &HashSet<u64>) -> Result<(), StoreError> {
    self.write_record(FAVORITES_KEY, ids)
  }
}

/// Store that keeps both records in memory only.
///
/// Nothing survives the process; useful in tests and anywhere durability
/// is explicitly unwanted.
#[derive(Default)]
pub struct MemoryStore {
  snapshot: Mutex<Option<Snapshot>>,
  favorites: Mutex<HashSet<u64>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl PersistentStore for MemoryStore {
  fn read_snapshot(&self) -> Option<Snapshot> {
    self.snapshot.lock().ok()?.clone()
  }

  fn write_snapshot(&self, products: &[Product]) -> Result<(), StoreError> {
    let mut slot = self
      .snapshot
      .lock()
      .map_err(|e| StoreError::Unavailable(format!("snapshot lock poisoned: {e}")))?;
    *slot = Some(Snapshot {
      products: products.to_vec(),
      fetched_at: Utc::now(),
    });
    Ok(())
  }

  fn read_favorite_ids(&self) -> HashSet<u64> {
    self
      .favorites
      .lock()
      .map(|ids| ids.clone())
      .unwrap_or_default()
  }

  fn write_favorite_ids(&self, ids: &HashSet<u64>) -> Result<(), StoreError> {
    let mut slot = self
      .favorites
      .lock()
      .map_err(|e| StoreError::Unavailable(format!("favorites lock poisoned: {e}")))?;
    *slot = ids.clone();
    Ok(())
  }
}
