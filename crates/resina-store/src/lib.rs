//! `RocksDB` storage layer for the AppResina catalog.
//!
//! This crate provides persistent storage for products, per-product
//! statistics, ratings, and favorites using `RocksDB` with column families
//! for efficient indexing.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `products`: Primary product records, keyed by `product_id`
//! - `products_by_created`: Index for newest-first product listings
//! - `statistics`: Per-product counters, keyed by `product_id`
//! - `ratings`: Primary rating records, keyed by `rating_id` (ULID)
//! - `ratings_by_product`: Index for listing ratings by product
//! - `rating_by_product_user`: Unique index enforcing one rating per
//!   (product, user) pair
//! - `favorites`: Favorite membership, keyed by `user_id || product_id`
//! - `favorites_by_product`: Index for per-product favorite counts
//!
//! # Example
//!
//! ```no_run
//! use resina_store::{ProductStore, RocksStore, StatisticsStore};
//! use resina_core::{NewProduct, ProductStatistics, UserId};
//! use chrono::Utc;
//!
//! let store = RocksStore::open("/tmp/appresina-db").unwrap();
//!
//! let id = store.next_product_id().unwrap();
//! let draft = NewProduct {
//!     name: "Resin coaster".into(),
//!     kind: "Casa".into(),
//!     price_cents: 1250,
//!     quantity: 3,
//!     description: "Hand-poured epoxy coaster".into(),
//!     image_url: None,
//!     available: true,
//!     owner: UserId::new(1),
//! };
//! store.put_product(&draft.into_product(id, Utc::now())).unwrap();
//! store.put_statistics(&ProductStatistics::zeroed(id, Utc::now())).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use resina_core::{Favorite, Product, ProductId, ProductStatistics, Rating, UserId};

/// The metric a ranked statistics query sorts by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatMetric {
    /// Rank by the view counter.
    Views,
    /// Rank by the sale counter.
    Sales,
    /// Rank by the favorite counter.
    Favorites,
    /// Rank by the stored trending score.
    Trending,
}

/// Product master storage.
pub trait ProductStore: Send + Sync {
    /// Allocate the next product id. Ids are monotonic within a store.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn next_product_id(&self) -> Result<ProductId>;

    /// Insert or update a product record, maintaining the created-at index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_product(&self, product: &Product) -> Result<()>;

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Delete a product by id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the product doesn't exist.
    fn delete_product(&self, id: ProductId) -> Result<()>;

    /// List all products, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_products(&self) -> Result<Vec<Product>>;

    /// List products with the given category tag, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_products_by_kind(&self, kind: &str) -> Result<Vec<Product>>;

    /// List available products, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_available_products(&self) -> Result<Vec<Product>>;

    /// List at most `limit` products, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_recent_products(&self, limit: usize) -> Result<Vec<Product>>;
}

/// Per-product counter storage.
pub trait StatisticsStore: Send + Sync {
    /// Insert or update a statistics record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_statistics(&self, stats: &ProductStatistics) -> Result<()>;

    /// Get the statistics record for a product. Absence means "all zero"
    /// to callers, never an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_statistics(&self, product_id: ProductId) -> Result<Option<ProductStatistics>>;

    /// Delete the statistics record for a product. Deleting a missing
    /// record is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn delete_statistics(&self, product_id: ProductId) -> Result<()>;

    /// Return at most `limit` statistics records sorted strictly descending
    /// by `metric`. Ties break by ascending product id (the store's key
    /// iteration order). `limit == 0` returns an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn top_by(&self, metric: StatMetric, limit: usize) -> Result<Vec<ProductStatistics>>;

    /// Increment the view counter, refresh `last_updated`, and rewrite the
    /// trending score. A missing record is created from zeros first (the
    /// crash window between product insert and statistics initialization is
    /// tolerated); callers are expected to pass live product ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn record_view(&self, product_id: ProductId) -> Result<ProductStatistics>;

    /// Add `quantity` to the sale counter, refresh `last_updated`, and
    /// rewrite the trending score.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn record_sale(&self, product_id: ProductId, quantity: u64) -> Result<ProductStatistics>;

    /// Increment the download counter, refresh `last_updated`, and rewrite
    /// the trending score.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn record_download(&self, product_id: ProductId) -> Result<ProductStatistics>;

    /// Recompute every stored trending score with decay as of now, without
    /// touching `last_updated`. Returns the number of records rewritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn refresh_trending_scores(&self) -> Result<usize>;
}

/// Rating storage.
pub trait RatingStore: Send + Sync {
    /// Insert a rating, replacing any previous rating by the same user for
    /// the same product (one rating per (user, product) pair).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_rating(&self, rating: &Rating) -> Result<()>;

    /// Delete a user's rating of a product.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no such rating exists.
    fn delete_rating(&self, product_id: ProductId, user_id: UserId) -> Result<()>;

    /// Get a user's rating of a product, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn rating_for_user(&self, product_id: ProductId, user_id: UserId) -> Result<Option<Rating>>;

    /// List all ratings of a product, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_ratings(&self, product_id: ProductId) -> Result<Vec<Rating>>;

    /// Mean rating score of a product, 0.0 when unrated.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn average_rating(&self, product_id: ProductId) -> Result<f64>;

    /// Number of ratings of a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn rating_count(&self, product_id: ProductId) -> Result<u64>;

    /// Delete all ratings of a product (used by cascade deletion).
    /// Returns the number of ratings removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn delete_ratings_for_product(&self, product_id: ProductId) -> Result<u64>;
}

/// Favorite membership storage.
pub trait FavoriteStore: Send + Sync {
    /// Add a favorite. A duplicate (user, product) pair is a silent no-op.
    ///
    /// Also increments the `favorites` counter in the product's statistics
    /// record in the same atomic write, so the membership count and the
    /// counter move together. Returns whether the favorite was newly added.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn add_favorite(&self, favorite: &Favorite) -> Result<bool>;

    /// Remove a favorite, decrementing the statistics counter in the same
    /// atomic write. Returns whether a membership record was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn remove_favorite(&self, user_id: UserId, product_id: ProductId) -> Result<bool>;

    /// Whether the user currently favorites the product.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn is_favorite(&self, user_id: UserId, product_id: ProductId) -> Result<bool>;

    /// Number of users that currently favorite the product.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn favorite_count(&self, product_id: ProductId) -> Result<u64>;

    /// List a user's favorites, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_favorites_by_user(&self, user_id: UserId) -> Result<Vec<Favorite>>;

    /// Delete all favorites of a product without touching its statistics
    /// record (used by cascade deletion, where the statistics record is
    /// removed too). Returns the number of memberships removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn delete_favorites_for_product(&self, product_id: ProductId) -> Result<u64>;
}

/// The full storage surface the aggregation service composes.
pub trait Store: ProductStore + StatisticsStore + RatingStore + FavoriteStore {}

impl<T: ProductStore + StatisticsStore + RatingStore + FavoriteStore> Store for T {}
