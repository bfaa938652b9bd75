use clap::Subcommand;
use color_eyre::Result;
use std::sync::Arc;

use crate::catalog::types::Product;
use crate::catalog::{list_categories, ApiClient, CatalogGateway, Fetched, Origin};
use crate::config::Config;
use crate::store::SqliteStore;

/// CLI commands: the presentation layer over the catalog gateway.
#[derive(Subcommand, Debug)]
pub enum Command {
  /// List the product catalog
  Products {
    /// Only show products in this category
    #[arg(short, long)]
    category: Option<String>,

    /// Only show products whose title or description contains this text
    #[arg(short, long)]
    search: Option<String>,
  },

  /// Show a single product
  Product { id: u64 },

  /// List the categories present in the catalog
  Categories,

  /// Toggle a product's favorite state
  Fav { id: u64 },

  /// List favorited products
  Favs,
}

/// Application context handed to the caller at startup.
///
/// Construction order is store, then client, then the gateway that owns
/// both; nothing in here is process-global.
pub struct App {
  gateway: CatalogGateway<SqliteStore, ApiClient>,
}

impl App {
  pub fn new(config: &Config) -> Result<Self> {
    let store = match &config.cache.path {
      Some(path) => SqliteStore::open_at(path)?,
      None => SqliteStore::open()?,
    };
    let client = ApiClient::new(&config.api)?;
    let gateway = CatalogGateway::new(Arc::new(store), client);

    Ok(Self { gateway })
  }

  pub async fn run(&self, command: Command) -> Result<()> {
    match command {
      Command::Products { category, search } => self.products(category, search).await,
      Command::Product { id } => self.product(id).await,
      Command::Categories => self.categories().await,
      Command::Fav { id } => self.fav(id).await,
      Command::Favs => self.favs().await,
    }
  }

  async fn products(&self, category: Option<String>, search: Option<String>) -> Result<()> {
    let fetched = self.gateway.fetch_catalog().await?;
    note_degraded(&fetched);

    let search = search.map(|s| s.to_lowercase());
    let rows: Vec<&Product> = fetched
      .data
      .iter()
      .filter(|p| match &category {
        Some(c) => p.category.eq_ignore_ascii_case(c),
        None => true,
      })
      .filter(|p| match &search {
        Some(s) => {
          p.title.to_lowercase().contains(s) || p.description.to_lowercase().contains(s)
        }
        None => true,
      })
      .collect();

    if rows.is_empty() {
      println!("No products match.");
      return Ok(());
    }

    for product in rows {
      println!(
        "{:>4}  {:>8.2}  {}  [{}]",
        product.id, product.price, product.title, product.category
      );
    }

    Ok(())
  }

  async fn product(&self, id: u64) -> Result<()> {
    let fetched = self.gateway.fetch_item(id).await?;
    note_degraded(&fetched);

    let product = fetched.data;
    let marker = if self.gateway.is_favorite(id).await {
      " ★"
    } else {
      ""
    };

    println!("#{} {}{}", product.id, product.title, marker);
    println!("Price:    {:.2}", product.price);
    println!("Category: {}", product.category);
    if let Some(rating) = &product.rating {
      println!("Rating:   {:.1} ({} ratings)", rating.rate, rating.count);
    }
    println!("Image:    {}", product.image);
    println!();
    println!("{}", product.description);

    Ok(())
  }

  async fn categories(&self) -> Result<()> {
    let fetched = self.gateway.fetch_catalog().await?;
    note_degraded(&fetched);

    for category in list_categories(&fetched.data) {
      println!("{category}");
    }

    Ok(())
  }

  async fn fav(&self, id: u64) -> Result<()> {
    if self.gateway.toggle_favorite(id).await {
      println!("Product {id} is now a favorite.");
    } else {
      println!("Product {id} is no longer a favorite.");
    }

    Ok(())
  }

  async fn favs(&self) -> Result<()> {
    let favorites = self.gateway.list_favorite_items().await;

    if favorites.is_empty() {
      println!("No favorites yet.");
      return Ok(());
    }

    for product in favorites {
      println!(
        "{:>4}  {:>8.2}  {}  [{}]",
        product.id, product.price, product.title, product.category
      );
    }

    Ok(())
  }
}

/// Tell the user on stderr when results came from the local snapshot, so
/// stdout stays clean data.
fn note_degraded<T>(fetched: &Fetched<T>) {
  if fetched.origin != Origin::Cache {
    return;
  }

  match fetched.fetched_at {
    Some(at) => {
      eprintln!(
        "(offline: showing catalog cached at {})",
        at.format("%Y-%m-%d %H:%M UTC")
      );
    }
    None => eprintln!("(offline: showing cached catalog)"),
  }
}
