use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::config::ApiConfig;

use super::source::CatalogSource;
use super::types::Product;

/// Catalog API client.
///
/// Thin wrapper around `reqwest::Client` with the base URL and the
/// request timeout applied once at construction.
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base_url: Url,
}

impl ApiClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let mut base_url = Url::parse(&config.url)
      .map_err(|e| eyre!("Invalid API url '{}': {}", config.url, e))?;

    // Url::join drops the last path segment unless the base ends with '/'
    if !base_url.path().ends_with('/') {
      base_url.set_path(&format!("{}/", base_url.path()));
    }

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base_url })
  }

  /// GET an endpoint relative to the base URL and decode the JSON body.
  async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
    let url = self
      .base_url
      .join(path)
      .map_err(|e| eyre!("Invalid endpoint '{}': {}", path, e))?;

    let response = self
      .http
      .get(url.clone())
      .send()
      .await
      .map_err(|e| eyre!("Request to {} failed: {}", url, e))?
      .error_for_status()
      .map_err(|e| eyre!("Request to {} failed: {}", url, e))?;

    response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse response from {}: {}", url, e))
  }
}

#[async_trait]
impl CatalogSource for ApiClient {
  async fn fetch_products(&self) -> Result<Vec<Product>> {
    self.get_json("products").await
  }

  async fn fetch_product(&self, id: u64) -> Result<Product> {
    self.get_json(&format!("products/{id}")).await
  }
}
