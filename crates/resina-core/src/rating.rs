//! Rating types for the AppResina catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ProductId, RatingId, UserId};

/// Lowest meaningful rating score. Enforcing the range is the input
/// layer's job; the core stores scores as given.
pub const MIN_RATING: u8 = 1;

/// Highest meaningful rating score.
pub const MAX_RATING: u8 = 5;

/// A single user's rating of a product.
///
/// The store keeps at most one rating per (user, product) pair; submitting a
/// new rating replaces the previous one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
    /// The rating identifier.
    pub id: RatingId,

    /// The rated product.
    pub product_id: ProductId,

    /// The rating user.
    pub user_id: UserId,

    /// Score, expected in `MIN_RATING..=MAX_RATING`. Stored as given;
    /// range validation happens upstream of the core.
    pub score: u8,

    /// Optional free-text comment.
    pub comment: Option<String>,

    /// When the rating was submitted.
    pub created_at: DateTime<Utc>,
}

impl Rating {
    /// Create a new rating with a generated id and the current timestamp.
    /// The score is taken as-is; callers validate the range before
    /// constructing.
    #[must_use]
    pub fn new(product_id: ProductId, user_id: UserId, score: u8, comment: Option<String>) -> Self {
        Self {
            id: RatingId::generate(),
            product_id,
            user_id,
            score,
            comment,
            created_at: Utc::now(),
        }
    }
}
