//! Key encoding utilities for `RocksDB`.
//!
//! This module provides functions for encoding and decoding keys used in
//! column families. Numeric ids are encoded big-endian so keys sort in
//! ascending id order; composite index keys are `prefix || suffix`
//! concatenations so a prefix scan yields one entity's records.

use chrono::{DateTime, Utc};
use resina_core::{ProductId, RatingId, UserId};

/// Create a product key from a product ID.
#[must_use]
pub fn product_key(product_id: ProductId) -> Vec<u8> {
    product_id.to_be_bytes().to_vec()
}

/// Create a statistics key from a product ID.
#[must_use]
pub fn statistics_key(product_id: ProductId) -> Vec<u8> {
    product_id.to_be_bytes().to_vec()
}

/// Create a created-at index key.
///
/// Format: `created_at_millis (8 bytes) || product_id (8 bytes)`
///
/// Timestamps before the epoch clamp to zero; products created in the same
/// millisecond tie-break by ascending id.
#[must_use]
pub fn created_index_key(created_at: DateTime<Utc>, product_id: ProductId) -> Vec<u8> {
    let mut key = Vec::with_capacity(16);
    key.extend_from_slice(&timestamp_millis(created_at).to_be_bytes());
    key.extend_from_slice(&product_id.to_be_bytes());
    key
}

/// Extract the product ID from a created-at index key.
///
/// # Panics
///
/// Panics if the key is not at least 16 bytes.
#[must_use]
pub fn extract_product_id_from_created_key(key: &[u8]) -> ProductId {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&key[8..16]);
    ProductId::from_be_bytes(bytes)
}

/// Extract the product ID from an 8-byte primary key.
///
/// # Panics
///
/// Panics if the key is not at least 8 bytes.
#[must_use]
pub fn extract_product_id(key: &[u8]) -> ProductId {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&key[..8]);
    ProductId::from_be_bytes(bytes)
}

/// Create a rating key from a rating ID.
#[must_use]
pub fn rating_key(rating_id: RatingId) -> Vec<u8> {
    rating_id.to_bytes().to_vec()
}

/// Create a product-rating index key.
///
/// Format: `product_id (8 bytes) || rating_id (16 bytes)`
///
/// Since ULIDs are time-ordered, a product's ratings scan oldest-first.
#[must_use]
pub fn product_rating_key(product_id: ProductId, rating_id: RatingId) -> Vec<u8> {
    let mut key = Vec::with_capacity(24);
    key.extend_from_slice(&product_id.to_be_bytes());
    key.extend_from_slice(&rating_id.to_bytes());
    key
}

/// Create a prefix for iterating all ratings of a product.
#[must_use]
pub fn product_ratings_prefix(product_id: ProductId) -> Vec<u8> {
    product_id.to_be_bytes().to_vec()
}

/// Extract the rating ID from a product-rating index key.
///
/// # Panics
///
/// Panics if the key is not at least 24 bytes.
#[must_use]
pub fn extract_rating_id_from_product_key(key: &[u8]) -> RatingId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[8..24]);
    RatingId::from_bytes(bytes)
}

/// Create the unique (product, user) rating index key.
///
/// Format: `product_id (8 bytes) || user_id (8 bytes)`
#[must_use]
pub fn product_user_rating_key(product_id: ProductId, user_id: UserId) -> Vec<u8> {
    let mut key = Vec::with_capacity(16);
    key.extend_from_slice(&product_id.to_be_bytes());
    key.extend_from_slice(&user_id.to_be_bytes());
    key
}

/// Create a favorite key.
///
/// Format: `user_id (8 bytes) || product_id (8 bytes)`
#[must_use]
pub fn favorite_key(user_id: UserId, product_id: ProductId) -> Vec<u8> {
    let mut key = Vec::with_capacity(16);
    key.extend_from_slice(&user_id.to_be_bytes());
    key.extend_from_slice(&product_id.to_be_bytes());
    key
}

/// Create a prefix for iterating all favorites of a user.
#[must_use]
pub fn user_favorites_prefix(user_id: UserId) -> Vec<u8> {
    user_id.to_be_bytes().to_vec()
}

/// Create a product-favorite index key.
///
/// Format: `product_id (8 bytes) || user_id (8 bytes)`
#[must_use]
pub fn product_favorite_key(product_id: ProductId, user_id: UserId) -> Vec<u8> {
    let mut key = Vec::with_capacity(16);
    key.extend_from_slice(&product_id.to_be_bytes());
    key.extend_from_slice(&user_id.to_be_bytes());
    key
}

/// Create a prefix for iterating all favorites of a product.
#[must_use]
pub fn product_favorites_prefix(product_id: ProductId) -> Vec<u8> {
    product_id.to_be_bytes().to_vec()
}

/// Extract the user ID from a product-favorite index key.
///
/// # Panics
///
/// Panics if the key is not at least 16 bytes.
#[must_use]
pub fn extract_user_id_from_product_favorite_key(key: &[u8]) -> UserId {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&key[8..16]);
    UserId::from_be_bytes(bytes)
}

/// Millisecond timestamp for index keys, clamped to non-negative.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn timestamp_millis(at: DateTime<Utc>) -> u64 {
    at.timestamp_millis().max(0) as u64
}
