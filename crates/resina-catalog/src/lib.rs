//! Product aggregation service for the AppResina catalog.
//!
//! This crate composes the four leaf stores (products, statistics, ratings,
//! favorites) into enriched product views and exposes:
//!
//! - Filtered catalog reads (`get_all`, `get_by_kind`, `get_available`)
//! - Popularity rankings (top sold/viewed/favorited/trending, most recent)
//! - Mutations (product CRUD, view/sale/download counters, favorites,
//!   ratings)
//! - Restartable snapshot streams that re-emit after every mutation
//!
//! Every read takes an explicit viewer [`resina_core::UserId`]; the engine
//! never assumes a default current user.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod service;
mod stream;

pub use config::{CatalogConfig, DEFAULT_TOP_LIMIT};
pub use service::CatalogService;

pub use resina_store::{Result, StoreError};
