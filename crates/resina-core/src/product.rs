//! Product types for the AppResina catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ProductId, UserId};

/// A product master record as persisted by the product store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// The product identifier, assigned by the store at insert time.
    pub id: ProductId,

    /// Display name.
    pub name: String,

    /// Free-form category tag (e.g. the resin type).
    pub kind: String,

    /// Price in integer cents. 1 cent = $0.01.
    pub price_cents: i64,

    /// Units in stock.
    pub quantity: u32,

    /// Free-text description.
    pub description: String,

    /// Reference to the product image, if any.
    pub image_url: Option<String>,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// Whether the product is currently offered.
    pub available: bool,

    /// The user that owns the listing.
    pub owner: UserId,
}

/// A product draft, everything but the store-assigned id and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    /// Display name.
    pub name: String,

    /// Free-form category tag.
    pub kind: String,

    /// Price in integer cents.
    pub price_cents: i64,

    /// Units in stock.
    pub quantity: u32,

    /// Free-text description.
    pub description: String,

    /// Reference to the product image, if any.
    pub image_url: Option<String>,

    /// Whether the product is currently offered.
    pub available: bool,

    /// The user that owns the listing.
    pub owner: UserId,
}

impl NewProduct {
    /// Turn the draft into a full product record with the given id and
    /// creation timestamp.
    #[must_use]
    pub fn into_product(self, id: ProductId, created_at: DateTime<Utc>) -> Product {
        Product {
            id,
            name: self.name,
            kind: self.kind,
            price_cents: self.price_cents,
            quantity: self.quantity,
            description: self.description,
            image_url: self.image_url,
            created_at,
            available: self.available,
            owner: self.owner,
        }
    }
}

/// A product joined with live rating, favorite, and view data.
///
/// Rebuilt on every read and never persisted or cached. The favorite flag is
/// always computed for the specific viewer that requested the read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedProduct {
    /// The underlying product record.
    pub product: Product,

    /// Mean rating across all users, 0.0 when unrated.
    pub average_rating: f64,

    /// Number of ratings submitted.
    pub rating_count: u64,

    /// Number of users that currently favorite the product.
    pub favorite_count: u64,

    /// Number of detail views registered.
    pub views: u64,

    /// Whether the requesting viewer has favorited the product.
    pub is_favorite: bool,
}
