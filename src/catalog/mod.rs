//! Offline-first access to the product catalog.
//!
//! The gateway fetches eagerly from the remote API, writes successful
//! full-catalog results through to the persistent store, and falls back to
//! the last persisted snapshot on any remote failure or empty payload.
//! Favorites are a set of product ids persisted independently and joined
//! against the snapshot on demand. This is not a sync engine: every fetch
//! is a single eager attempt, and cache fallback is the sole resilience
//! mechanism.

pub mod client;
pub mod gateway;
pub mod source;
pub mod types;

pub use client::ApiClient;
pub use gateway::{list_categories, CatalogGateway, Fetched, GatewayError, Origin};
pub use source::CatalogSource;
