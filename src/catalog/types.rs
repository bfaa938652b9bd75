use serde::{Deserialize, Serialize};

/// A single catalog product, mirroring the remote JSON shape.
///
/// This layer never modifies products; it only stores and returns what the
/// remote source sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
  pub id: u64,
  pub title: String,
  pub price: f64,
  pub description: String,
  pub category: String,
  /// Product image URI
  pub image: String,
  /// Not every payload carries a rating
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rating: Option<Rating>,
}

/// Aggregate customer rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
  /// Average score, 0 to 5
  pub rate: f64,
  /// Number of ratings the average is based on
  pub count: u64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_product_deserializes_remote_shape() {
    let json = r#"{
      "id": 1,
      "title": "Fjallraven backpack",
      "price": 109.95,
      "description": "Fits 15 inch laptops",
      "category": "men's clothing",
      "image": "https://example.com/81fPKd-2AYL.jpg",
      "rating": { "rate": 3.9, "count": 120 }
    }"#;

    let product: Product = serde_json::from_str(json).unwrap();
    assert_eq!(product.id, 1);
    assert_eq!(product.category, "men's clothing");
    assert_eq!(product.rating.as_ref().unwrap().count, 120);
  }

  #[test]
  fn test_product_rating_is_optional() {
    let json = r#"{
      "id": 7,
      "title": "Bracelet",
      "price": 9.99,
      "description": "Gold plated",
      "category": "jewelery",
      "image": "https://example.com/bracelet.jpg"
    }"#;

    let product: Product = serde_json::from_str(json).unwrap();
    assert!(product.rating.is_none());
  }
}
