//! Per-product statistics and the trending-score calculator.
//!
//! Every live product has one statistics record tracking its view, download,
//! sale, and favorite counters, plus a derived trending score. Callers treat
//! a missing record as all-zero rather than an error, so a crash between
//! product insert and statistics initialization is tolerated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ProductId;

// ============================================================================
// Constants
// ============================================================================

/// Weight of the view counter in the trending score.
pub const VIEW_WEIGHT: f64 = 0.3;

/// Weight of the favorite counter in the trending score.
pub const FAVORITE_WEIGHT: f64 = 0.4;

/// Weight of the sale counter in the trending score.
pub const SALE_WEIGHT: f64 = 0.2;

/// Weight of the download counter in the trending score.
pub const DOWNLOAD_WEIGHT: f64 = 0.1;

/// Hours of inactivity after which the trending score has halved.
pub const DECAY_WINDOW_HOURS: f64 = 24.0;

/// Milliseconds per hour, used to truncate elapsed time toward zero.
const MILLIS_PER_HOUR: i64 = 3_600_000;

/// Compute the time-decayed trending score for a set of counters.
///
/// The weighted popularity `0.3*views + 0.4*favorites + 0.2*sales +
/// 0.1*downloads` is divided by `1 + elapsed_hours / 24`, so a product that
/// receives no activity halves its score roughly every 24 hours. The result
/// is never negative; all-zero counters score 0 regardless of elapsed time.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn trending_score(
    views: u64,
    favorites: u64,
    sales: u64,
    downloads: u64,
    elapsed_hours: u64,
) -> f64 {
    let popularity = VIEW_WEIGHT * views as f64
        + FAVORITE_WEIGHT * favorites as f64
        + SALE_WEIGHT * sales as f64
        + DOWNLOAD_WEIGHT * downloads as f64;
    let decay = 1.0 + elapsed_hours as f64 / DECAY_WINDOW_HOURS;
    popularity / decay
}

/// Per-product popularity counters.
///
/// One record per product id. Counters are only moved by the dedicated store
/// operations; `trending_score` is derived and rewritten whenever a counter
/// changes or a refresh pass runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductStatistics {
    /// The product these counters belong to.
    pub product_id: ProductId,

    /// Number of detail views registered.
    pub views: u64,

    /// Number of downloads recorded.
    pub downloads: u64,

    /// Number of sales recorded.
    pub sales: u64,

    /// Number of users that currently favorite the product. Maintained in
    /// lockstep with the favorite store's membership records.
    pub favorites: u64,

    /// Derived time-decayed popularity score.
    pub trending_score: f64,

    /// When a counter last changed.
    pub last_updated: DateTime<Utc>,
}

impl ProductStatistics {
    /// Create a zeroed statistics record for a product.
    #[must_use]
    pub fn zeroed(product_id: ProductId, now: DateTime<Utc>) -> Self {
        Self {
            product_id,
            views: 0,
            downloads: 0,
            sales: 0,
            favorites: 0,
            trending_score: 0.0,
            last_updated: now,
        }
    }

    /// Hours elapsed since the last counter change, truncated toward zero.
    /// A `now` before `last_updated` (clock skew) counts as zero.
    #[must_use]
    pub fn elapsed_hours(&self, now: DateTime<Utc>) -> u64 {
        let millis = (now - self.last_updated).num_milliseconds().max(0);
        #[allow(clippy::cast_sign_loss)]
        {
            (millis / MILLIS_PER_HOUR) as u64
        }
    }

    /// Compute the trending score of these counters as of `now`.
    #[must_use]
    pub fn score_at(&self, now: DateTime<Utc>) -> f64 {
        trending_score(
            self.views,
            self.favorites,
            self.sales,
            self.downloads,
            self.elapsed_hours(now),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn zero_counters_score_zero_for_any_age() {
        for hours in [0, 1, 24, 10_000] {
            assert_eq!(trending_score(0, 0, 0, 0, hours), 0.0);
        }
    }

    #[test]
    fn no_decay_at_zero_hours() {
        let score = trending_score(10, 4, 2, 1, 0);
        let expected = 0.3 * 10.0 + 0.4 * 4.0 + 0.2 * 2.0 + 0.1;
        assert!((score - expected).abs() < 1e-12);
        assert!((score - 5.1).abs() < 1e-12);
    }

    #[test]
    fn score_halves_after_one_decay_window() {
        let fresh = trending_score(10, 4, 2, 1, 0);
        let aged = trending_score(10, 4, 2, 1, 24);
        assert!((aged - fresh / 2.0).abs() < 1e-12);
        assert!((aged - 2.55).abs() < 1e-12);
    }

    #[test]
    fn score_is_non_increasing_in_elapsed_hours() {
        let mut previous = f64::INFINITY;
        for hours in [0, 1, 2, 12, 24, 48, 1_000, 1_000_000] {
            let score = trending_score(100, 50, 20, 10, hours);
            assert!(score <= previous);
            assert!(score >= 0.0);
            previous = score;
        }
    }

    #[test]
    fn score_is_strictly_increasing_in_each_counter() {
        let base = trending_score(10, 10, 10, 10, 5);
        assert!(trending_score(11, 10, 10, 10, 5) > base);
        assert!(trending_score(10, 11, 10, 10, 5) > base);
        assert!(trending_score(10, 10, 11, 10, 5) > base);
        assert!(trending_score(10, 10, 10, 11, 5) > base);
    }

    #[test]
    fn elapsed_hours_truncates_toward_zero() {
        let now = Utc::now();
        let mut stats = ProductStatistics::zeroed(ProductId::new(1), now);

        stats.last_updated = now - Duration::minutes(59);
        assert_eq!(stats.elapsed_hours(now), 0);

        stats.last_updated = now - Duration::minutes(61);
        assert_eq!(stats.elapsed_hours(now), 1);

        // Clock skew: last_updated in the future counts as zero.
        stats.last_updated = now + Duration::hours(5);
        assert_eq!(stats.elapsed_hours(now), 0);
    }

    #[test]
    fn score_at_uses_truncated_hours() {
        let now = Utc::now();
        let mut stats = ProductStatistics::zeroed(ProductId::new(7), now);
        stats.views = 10;
        stats.favorites = 4;
        stats.sales = 2;
        stats.downloads = 1;

        assert!((stats.score_at(now) - 5.1).abs() < 1e-12);

        stats.last_updated = now - Duration::hours(24);
        assert!((stats.score_at(now) - 2.55).abs() < 1e-12);
    }
}
