//! Remote catalog source trait.

use async_trait::async_trait;
use color_eyre::Result;

use super::types::Product;

/// A remote source of catalog data.
///
/// The gateway only cares whether a fetch produced data or not, so
/// transport failures (timeout, connection error, non-2xx status) stay
/// opaque here. Implementations make a single attempt per call; retrying
/// is not this layer's job.
#[async_trait]
pub trait CatalogSource: Send + Sync {
  /// Fetch the full product catalog.
  async fn fetch_products(&self) -> Result<Vec<Product>>;

  /// Fetch a single product by id.
  async fn fetch_product(&self, id: u64) -> Result<Product>;
}
