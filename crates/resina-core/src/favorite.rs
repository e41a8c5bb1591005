//! Favorite membership types for the AppResina catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{FavoriteId, ProductId, UserId};

/// A (user, product) favorite membership record.
///
/// Uniqueness of the pair is enforced by the store: adding a favorite that
/// already exists is a silent no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    /// The favorite identifier.
    pub id: FavoriteId,

    /// The user that marked the product.
    pub user_id: UserId,

    /// The marked product.
    pub product_id: ProductId,

    /// When the favorite was added.
    pub added_at: DateTime<Utc>,
}

impl Favorite {
    /// Create a new favorite with a generated id and the current timestamp.
    #[must_use]
    pub fn new(user_id: UserId, product_id: ProductId) -> Self {
        Self {
            id: FavoriteId::generate(),
            user_id,
            product_id,
            added_at: Utc::now(),
        }
    }
}
