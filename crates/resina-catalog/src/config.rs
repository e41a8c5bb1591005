//! Catalog configuration.

use std::path::PathBuf;

/// Default number of entries returned by ranking queries when the caller
/// passes no limit.
pub const DEFAULT_TOP_LIMIT: usize = 20;

/// Catalog configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Path to the `RocksDB` data directory (default: "/data/appresina").
    pub data_dir: PathBuf,

    /// Ranking limit applied when the caller passes `None` (default: 20).
    pub default_top_limit: usize,
}

impl CatalogConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            data_dir: std::env::var("APPRESINA_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/data/appresina")),
            default_top_limit: std::env::var("APPRESINA_TOP_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TOP_LIMIT),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/data/appresina"),
            default_top_limit: DEFAULT_TOP_LIMIT,
        }
    }
}
