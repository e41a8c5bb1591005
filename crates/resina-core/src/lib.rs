//! Core types for the AppResina catalog.
//!
//! This crate provides the foundational types used throughout the catalog
//! engine:
//!
//! - **Identifiers**: `ProductId`, `UserId`, `RatingId`, `FavoriteId`
//! - **Products**: `Product`, `NewProduct`, `EnrichedProduct`
//! - **Statistics**: `ProductStatistics` and the trending-score calculator
//! - **Ratings**: `Rating`
//! - **Favorites**: `Favorite`
//!
//! # Money
//!
//! Prices are stored as integer cents (`price_cents: i64`) to avoid floating
//! point precision issues. A product priced at $12.50 carries
//! `price_cents = 1250`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod favorite;
pub mod ids;
pub mod product;
pub mod rating;
pub mod stats;

pub use favorite::Favorite;
pub use ids::{FavoriteId, IdError, ProductId, RatingId, UserId};
pub use product::{EnrichedProduct, NewProduct, Product};
pub use rating::{Rating, MAX_RATING, MIN_RATING};
pub use stats::{
    trending_score, ProductStatistics, DECAY_WINDOW_HOURS, DOWNLOAD_WEIGHT, FAVORITE_WEIGHT,
    SALE_WEIGHT, VIEW_WEIGHT,
};
