//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary product records, keyed by `product_id` (8-byte big-endian).
    pub const PRODUCTS: &str = "products";

    /// Index: products by creation time, keyed by
    /// `created_at_millis || product_id`. Value is empty (index only).
    /// Iterated in reverse for newest-first listings.
    pub const PRODUCTS_BY_CREATED: &str = "products_by_created";

    /// Per-product counter records, keyed by `product_id`.
    pub const STATISTICS: &str = "statistics";

    /// Primary rating records, keyed by `rating_id` (ULID).
    pub const RATINGS: &str = "ratings";

    /// Index: ratings by product, keyed by `product_id || rating_id`.
    /// Value is empty (index only).
    pub const RATINGS_BY_PRODUCT: &str = "ratings_by_product";

    /// Unique index: one rating per (product, user), keyed by
    /// `product_id || user_id`. Value is the rating id.
    pub const RATING_BY_PRODUCT_USER: &str = "rating_by_product_user";

    /// Primary favorite records, keyed by `user_id || product_id`.
    pub const FAVORITES: &str = "favorites";

    /// Index: favorites by product, keyed by `product_id || user_id`.
    /// Value is empty (index only).
    pub const FAVORITES_BY_PRODUCT: &str = "favorites_by_product";

    /// Store-level metadata, currently just the persisted product id
    /// sequence. Keeps deleted ids from being reissued after a reopen.
    pub const META: &str = "meta";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::PRODUCTS,
        cf::PRODUCTS_BY_CREATED,
        cf::STATISTICS,
        cf::RATINGS,
        cf::RATINGS_BY_PRODUCT,
        cf::RATING_BY_PRODUCT_USER,
        cf::FAVORITES,
        cf::FAVORITES_BY_PRODUCT,
        cf::META,
    ]
}
