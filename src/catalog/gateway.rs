//! Offline-first gateway between the remote catalog and the local store.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::store::PersistentStore;

use super::source::CatalogSource;
use super::types::Product;

/// Where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
  /// Fresh data from the remote source
  Remote,
  /// Data served from the persisted snapshot
  Cache,
}

/// The two conditions the gateway surfaces to its caller. Transport and
/// storage failures never appear here; they are degraded to the cache or
/// to one of these.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
  /// Remote fetch failed or came back empty, and no usable snapshot exists
  #[error("no catalog data available")]
  NoData,

  /// Product absent from both the remote source and the cached snapshot
  #[error("product {0} not found")]
  NotFound(u64),
}

/// Fetched data tagged with its origin.
#[derive(Debug, Clone)]
pub struct Fetched<T> {
  pub data: T,
  pub origin: Origin,
  /// When the backing snapshot was taken. Only set on cache-origin results.
  pub fetched_at: Option<DateTime<Utc>>,
}

impl<T> Fetched<T> {
  fn remote(data: T) -> Self {
    Self {
      data,
      origin: Origin::Remote,
      fetched_at: None,
    }
  }

  fn cached(data: T, fetched_at: DateTime<Utc>) -> Self {
    Self {
      data,
      origin: Origin::Cache,
      fetched_at: Some(fetched_at),
    }
  }
}

/// Orchestrates remote fetches against the persistent store.
///
/// Successful full-catalog fetches are written through to the store;
/// failures fall back to the last persisted snapshot. Favorites are a set
/// of product ids persisted independently of the snapshot and joined
/// against it on demand.
///
/// Both collaborators are injected, so tests run against an in-memory
/// store and a scripted source. The store must be constructed first.
pub struct CatalogGateway<S, C> {
  store: Arc<S>,
  source: C,
  /// Serializes read-modify-write of the favorites record. The record is
  /// one full set, so the critical section covers the whole set, not one id.
  favorites_lock: Mutex<()>,
}

impl<S: PersistentStore, C: CatalogSource> CatalogGateway<S, C> {
  pub fn new(store: Arc<S>, source: C) -> Self {
    Self {
      store,
      source,
      favorites_lock: Mutex::new(()),
    }
  }

  /// Fetch the full catalog, remote first.
  ///
  /// A non-empty remote result is persisted (best effort) and returned as
  /// `Origin::Remote`. On any remote failure, and equally on an empty
  /// remote payload, the persisted snapshot is served as `Origin::Cache`.
  /// Only when both sides come up empty does the caller see
  /// `GatewayError::NoData`.
  pub async fn fetch_catalog(&self) -> Result<Fetched<Vec<Product>>, GatewayError> {
    match self.source.fetch_products().await {
      Ok(products) if !products.is_empty() => {
        // Best-effort persist; the fetched data is returned either way
        if let Err(e) = self.store.write_snapshot(&products) {
          warn!("failed to persist catalog snapshot: {e}");
        }
        Ok(Fetched::remote(products))
      }
      Ok(_) => {
        debug!("remote returned an empty catalog, falling back to cache");
        self.cached_catalog()
      }
      Err(e) => {
        warn!("remote catalog fetch failed, falling back to cache: {e:#}");
        self.cached_catalog()
      }
    }
  }

  fn cached_catalog(&self) -> Result<Fetched<Vec<Product>>, GatewayError> {
    match self.store.read_snapshot() {
      Some(snapshot) if !snapshot.products.is_empty() => {
        Ok(Fetched::cached(snapshot.products, snapshot.fetched_at))
      }
      _ => Err(GatewayError::NoData),
    }
  }

  /// Fetch a single product, remote first, snapshot second.
  ///
  /// Never writes through: a single-item response must not turn the
  /// persisted full catalog into a partial one.
  pub async fn fetch_item(&self, id: u64) -> Result<Fetched<Product>, GatewayError> {
    match self.source.fetch_product(id).await {
      Ok(product) => Ok(Fetched::remote(product)),
      Err(e) => {
        debug!("remote fetch of product {id} failed, searching cache: {e:#}");
        let snapshot = self.store.read_snapshot().ok_or(GatewayError::NotFound(id))?;
        let fetched_at = snapshot.fetched_at;
        snapshot
          .products
          .into_iter()
          .find(|p| p.id == id)
          .map(|p| Fetched::cached(p, fetched_at))
          .ok_or(GatewayError::NotFound(id))
      }
    }
  }

  /// Flip the favorite state of a product id and persist the full set.
  /// Returns the new membership state.
  pub async fn toggle_favorite(&self, id: u64) -> bool {
    let _guard = self.favorites_lock.lock().await;

    let mut ids = self.store.read_favorite_ids();
    let is_now_favorite = !ids.remove(&id);
    if is_now_favorite {
      ids.insert(id);
    }

    if let Err(e) = self.store.write_favorite_ids(&ids) {
      warn!("failed to persist favorites: {e}");
    }

    is_now_favorite
  }

  /// Whether a product id is currently favorited.
  pub async fn is_favorite(&self, id: u64) -> bool {
    self.store.read_favorite_ids().contains(&id)
  }

  /// Favorited products, in snapshot order.
  ///
  /// Favorite ids with no counterpart in the snapshot (the catalog moved
  /// on) are skipped, never purged: the id stays in the set and resurfaces
  /// if the product comes back.
  pub async fn list_favorite_items(&self) -> Vec<Product> {
    let ids = self.store.read_favorite_ids();
    if ids.is_empty() {
      return Vec::new();
    }

    let Some(snapshot) = self.store.read_snapshot() else {
      return Vec::new();
    };

    snapshot
      .products
      .into_iter()
      .filter(|p| ids.contains(&p.id))
      .collect()
  }
}

/// Unique categories present in `products`, in ascending lexical order.
/// Pure derivation, no I/O.
pub fn list_categories(products: &[Product]) -> Vec<String> {
  let categories: BTreeSet<&str> = products.iter().map(|p| p.category.as_str()).collect();
  categories.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::{MemoryStore, Snapshot, StoreError};
  use async_trait::async_trait;
  use color_eyre::{eyre::eyre, Result};
  use std::collections::HashSet;

  /// Scripted remote source: either serves a fixed catalog or fails
  /// every call.
  enum Remote {
    Up(Vec<Product>),
    Down,
  }

  struct FakeSource {
    remote: Remote,
  }

  #[async_trait]
  impl CatalogSource for FakeSource {
    async fn fetch_products(&self) -> Result<Vec<Product>> {
      match &self.remote {
        Remote::Up(products) => Ok(products.clone()),
        Remote::Down => Err(eyre!("connection refused")),
      }
    }

    async fn fetch_product(&self, id: u64) -> Result<Product> {
      match &self.remote {
        Remote::Up(products) => products
          .iter()
          .find(|p| p.id == id)
          .cloned()
          .ok_or_else(|| eyre!("404 Not Found")),
        Remote::Down => Err(eyre!("connection refused")),
      }
    }
  }

  /// Store whose writes always fail, for exercising the best-effort paths.
  struct FailingStore;

  impl PersistentStore for FailingStore {
    fn read_snapshot(&self) -> Option<Snapshot> {
      None
    }

    fn write_snapshot(&self, _products: &[Product]) -> Result<(), StoreError> {
      Err(StoreError::Unavailable("disk full".into()))
    }

    fn read_favorite_ids(&self) -> HashSet<u64> {
      HashSet::new()
    }

    fn write_favorite_ids(&self, _ids: &HashSet<u64>) -> Result<(), StoreError> {
      Err(StoreError::Unavailable("disk full".into()))
    }
  }

  fn product(id: u64, category: &str) -> Product {
    Product {
      id,
      title: format!("Product {id}"),
      price: id as f64,
      description: String::new(),
      category: category.to_string(),
      image: format!("https://example.com/{id}.jpg"),
      rating: None,
    }
  }

  fn gateway(remote: Remote) -> (Arc<MemoryStore>, CatalogGateway<MemoryStore, FakeSource>) {
    let store = Arc::new(MemoryStore::new());
    let gateway = CatalogGateway::new(store.clone(), FakeSource { remote });
    (store, gateway)
  }

  #[tokio::test]
  async fn test_fetch_catalog_from_remote_persists_snapshot() {
    let products = vec![product(1, "a"), product(2, "b")];
    let (store, gateway) = gateway(Remote::Up(products.clone()));

    let fetched = gateway.fetch_catalog().await.unwrap();
    assert_eq!(fetched.origin, Origin::Remote);
    assert_eq!(fetched.data, products);

    // The persisted snapshot equals exactly the returned items
    assert_eq!(store.read_snapshot().unwrap().products, products);
  }

  #[tokio::test]
  async fn test_fetch_catalog_falls_back_to_cache_on_failure() {
    let (store, gateway) = gateway(Remote::Down);
    store.write_snapshot(&[product(1, "a")]).unwrap();

    let fetched = gateway.fetch_catalog().await.unwrap();
    assert_eq!(fetched.origin, Origin::Cache);
    assert_eq!(fetched.data, vec![product(1, "a")]);
    assert!(fetched.fetched_at.is_some());
  }

  #[tokio::test]
  async fn test_fetch_catalog_without_remote_or_cache_is_no_data() {
    let (_store, gateway) = gateway(Remote::Down);

    assert_eq!(gateway.fetch_catalog().await.unwrap_err(), GatewayError::NoData);
  }

  #[tokio::test]
  async fn test_empty_remote_payload_falls_back_to_cache() {
    let (store, gateway) = gateway(Remote::Up(Vec::new()));
    store.write_snapshot(&[product(3, "c")]).unwrap();

    // An empty payload is not valid data; it must not reach the caller
    // and must not overwrite the snapshot
    let fetched = gateway.fetch_catalog().await.unwrap();
    assert_eq!(fetched.origin, Origin::Cache);
    assert_eq!(fetched.data, vec![product(3, "c")]);
    assert_eq!(store.read_snapshot().unwrap().products, vec![product(3, "c")]);
  }

  #[tokio::test]
  async fn test_empty_remote_payload_without_cache_is_no_data() {
    let (_store, gateway) = gateway(Remote::Up(Vec::new()));

    assert_eq!(gateway.fetch_catalog().await.unwrap_err(), GatewayError::NoData);
  }

  #[tokio::test]
  async fn test_snapshot_write_failure_does_not_downgrade_result() {
    let store = Arc::new(FailingStore);
    let source = FakeSource {
      remote: Remote::Up(vec![product(1, "a")]),
    };
    let gateway = CatalogGateway::new(store, source);

    let fetched = gateway.fetch_catalog().await.unwrap();
    assert_eq!(fetched.origin, Origin::Remote);
    assert_eq!(fetched.data, vec![product(1, "a")]);
  }

  #[tokio::test]
  async fn test_fetch_item_never_touches_the_snapshot() {
    let cached = vec![product(1, "a")];
    let remote = vec![product(1, "a"), product(2, "b")];
    let (store, gateway) = gateway(Remote::Up(remote));
    store.write_snapshot(&cached).unwrap();
    let before = store.read_snapshot().unwrap();

    let fetched = gateway.fetch_item(2).await.unwrap();
    assert_eq!(fetched.origin, Origin::Remote);
    assert_eq!(fetched.data, product(2, "b"));

    // Single-item fetches must not leak into the persisted full catalog
    let after = store.read_snapshot().unwrap();
    assert_eq!(after.products, before.products);
    assert_eq!(after.fetched_at, before.fetched_at);
  }

  #[tokio::test]
  async fn test_fetch_item_falls_back_to_cache() {
    let (store, gateway) = gateway(Remote::Down);
    store.write_snapshot(&[product(1, "a"), product(2, "b")]).unwrap();

    let fetched = gateway.fetch_item(2).await.unwrap();
    assert_eq!(fetched.origin, Origin::Cache);
    assert_eq!(fetched.data, product(2, "b"));
    assert!(fetched.fetched_at.is_some());
  }

  #[tokio::test]
  async fn test_fetch_item_missing_everywhere_is_not_found() {
    let (store, gateway) = gateway(Remote::Down);
    store.write_snapshot(&[product(1, "a")]).unwrap();

    assert_eq!(
      gateway.fetch_item(42).await.unwrap_err(),
      GatewayError::NotFound(42)
    );
  }

  #[tokio::test]
  async fn test_fetch_item_remote_404_falls_back_to_cache() {
    // Remote is reachable but does not know the id; the snapshot does
    let (store, gateway) = gateway(Remote::Up(vec![product(1, "a")]));
    store.write_snapshot(&[product(1, "a"), product(7, "b")]).unwrap();

    let fetched = gateway.fetch_item(7).await.unwrap();
    assert_eq!(fetched.origin, Origin::Cache);
    assert_eq!(fetched.data, product(7, "b"));
  }

  #[tokio::test]
  async fn test_toggle_favorite_twice_restores_original_state() {
    let (store, gateway) = gateway(Remote::Down);

    assert!(gateway.toggle_favorite(5).await);
    assert!(gateway.is_favorite(5).await);

    assert!(!gateway.toggle_favorite(5).await);
    assert!(!gateway.is_favorite(5).await);
    assert!(store.read_favorite_ids().is_empty());
  }

  #[tokio::test]
  async fn test_toggle_favorite_reports_state_even_if_write_fails() {
    let gateway = CatalogGateway::new(Arc::new(FailingStore), FakeSource { remote: Remote::Down });

    // The write failure is swallowed; the flip is still reported
    assert!(gateway.toggle_favorite(1).await);
  }

  #[tokio::test]
  async fn test_concurrent_toggles_on_different_ids_both_survive() {
    let (store, gateway) = gateway(Remote::Down);

    futures::join!(gateway.toggle_favorite(1), gateway.toggle_favorite(2));

    let ids = store.read_favorite_ids();
    assert!(ids.contains(&1));
    assert!(ids.contains(&2));
  }

  #[tokio::test]
  async fn test_favorite_items_join_skips_stale_ids() {
    let (store, gateway) = gateway(Remote::Down);
    store
      .write_snapshot(&[product(1, "a"), product(2, "a"), product(3, "a")])
      .unwrap();
    store.write_favorite_ids(&[2, 5].into_iter().collect()).unwrap();

    // Id 5 has no snapshot counterpart: skipped, but still in the set
    let favorites = gateway.list_favorite_items().await;
    assert_eq!(favorites, vec![product(2, "a")]);
    assert!(store.read_favorite_ids().contains(&5));
  }

  #[tokio::test]
  async fn test_favorite_items_keep_snapshot_order() {
    let (store, gateway) = gateway(Remote::Down);
    store
      .write_snapshot(&[product(1, "a"), product(2, "a"), product(3, "a")])
      .unwrap();
    store.write_favorite_ids(&[3, 1].into_iter().collect()).unwrap();

    let favorites = gateway.list_favorite_items().await;
    assert_eq!(favorites, vec![product(1, "a"), product(3, "a")]);
  }

  #[tokio::test]
  async fn test_favorite_items_without_snapshot_is_empty() {
    let (store, gateway) = gateway(Remote::Down);
    store.write_favorite_ids(&[1].into_iter().collect()).unwrap();

    assert!(gateway.list_favorite_items().await.is_empty());
  }

  #[test]
  fn test_list_categories_sorted_and_unique() {
    let products = vec![
      product(1, "a"),
      product(2, "c"),
      product(3, "a"),
      product(4, "b"),
    ];

    assert_eq!(list_categories(&products), vec!["a", "b", "c"]);
    assert!(list_categories(&[]).is_empty());
  }
}
