//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the four storage
//! traits. Compound writes that must not be torn (favorite membership plus
//! its statistics counter, rating replacement across the unique index) go
//! through a single `WriteBatch`.

use std::cmp::Ordering as CmpOrdering;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use resina_core::{
    Favorite, Product, ProductId, ProductStatistics, Rating, RatingId, UserId,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{FavoriteStore, ProductStore, RatingStore, StatMetric, StatisticsStore};

/// Meta key holding the next product id to hand out.
const NEXT_PRODUCT_ID_KEY: &[u8] = b"next_product_id";

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    /// Next product id, persisted to the meta column family on every
    /// allocation so deleted ids are never handed out again.
    next_product_id: Mutex<u64>,
    /// Serializes read-modify-write cycles on statistics records. Without
    /// it, two concurrent favorite adds can both read the same counter
    /// value and one increment is lost for good.
    stats_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// The product id sequence resumes from the highest existing key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path.as_ref(), cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let store = Self {
            db: Arc::new(db),
            next_product_id: Mutex::new(1),
            stats_lock: Mutex::new(()),
        };

        // The persisted sequence survives deletes; databases written before
        // the meta column family existed fall back to the highest live key.
        let next = match store.read_next_product_id()? {
            Some(next) => next,
            None => store.highest_product_id()? + 1,
        };
        *store.lock(&store.next_product_id)? = next;

        tracing::info!(
            path = %path.as_ref().display(),
            next_product_id = next,
            "Opened catalog store"
        );

        Ok(store)
    }

    /// Acquire a mutex, mapping poisoning to a database error.
    fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> Result<MutexGuard<'a, T>> {
        mutex
            .lock()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }

    /// Read the persisted id sequence, if the database carries one.
    fn read_next_product_id(&self) -> Result<Option<u64>> {
        let cf = self.cf(cf::META)?;
        let Some(data) = self
            .db
            .get_cf(&cf, NEXT_PRODUCT_ID_KEY)
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let bytes: [u8; 8] = data
            .as_slice()
            .try_into()
            .map_err(|_| StoreError::Serialization("invalid id sequence bytes".into()))?;
        Ok(Some(u64::from_be_bytes(bytes)))
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Highest product id currently in the primary column family, 0 if empty.
    fn highest_product_id(&self) -> Result<u64> {
        let cf = self.cf(cf::PRODUCTS)?;
        let mut iter = self.db.iterator_cf(&cf, IteratorMode::End);
        match iter.next() {
            Some(item) => {
                let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
                Ok(keys::extract_product_id(&key).value())
            }
            None => Ok(0),
        }
    }

    /// Decode a rating id stored as a unique-index value.
    fn rating_id_from_value(data: &[u8]) -> Result<RatingId> {
        let bytes: [u8; 16] = data
            .try_into()
            .map_err(|_| StoreError::Serialization("invalid rating id bytes".into()))?;
        Ok(RatingId::from_bytes(bytes))
    }

    /// List products newest-first, keeping those that match `keep`, at most
    /// `limit` of them.
    fn scan_products<F>(&self, limit: usize, keep: F) -> Result<Vec<Product>>
    where
        F: Fn(&Product) -> bool,
    {
        let cf_index = self.cf(cf::PRODUCTS_BY_CREATED)?;
        let mut products = Vec::new();

        // The created-at index sorts ascending; iterate from the end for
        // newest-first.
        for item in self.db.iterator_cf(&cf_index, IteratorMode::End) {
            if products.len() >= limit {
                break;
            }

            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let id = keys::extract_product_id_from_created_key(&key);

            // A dangling index entry (product deleted mid-scan) is skipped.
            if let Some(product) = self.get_product(id)? {
                if keep(&product) {
                    products.push(product);
                }
            }
        }

        Ok(products)
    }

    /// Read-modify-write a statistics record: apply `apply`, refresh
    /// `last_updated`, and rewrite the trending score. A missing record is
    /// synthesized from zeros. Serialized by `stats_lock` so concurrent
    /// counter updates never lose an increment.
    fn update_statistics_with<F>(&self, product_id: ProductId, apply: F) -> Result<ProductStatistics>
    where
        F: FnOnce(&mut ProductStatistics),
    {
        let _guard = self.lock(&self.stats_lock)?;

        let now = Utc::now();
        let mut stats = self
            .get_statistics(product_id)?
            .unwrap_or_else(|| ProductStatistics::zeroed(product_id, now));

        apply(&mut stats);
        stats.last_updated = now;
        stats.trending_score = stats.score_at(now);

        self.put_statistics(&stats)?;
        Ok(stats)
    }

    /// Descending comparison of two statistics records by a metric.
    fn compare_by_metric(
        metric: StatMetric,
        a: &ProductStatistics,
        b: &ProductStatistics,
    ) -> CmpOrdering {
        match metric {
            StatMetric::Views => b.views.cmp(&a.views),
            StatMetric::Sales => b.sales.cmp(&a.sales),
            StatMetric::Favorites => b.favorites.cmp(&a.favorites),
            StatMetric::Trending => b.trending_score.total_cmp(&a.trending_score),
        }
    }
}

impl ProductStore for RocksStore {
    fn next_product_id(&self) -> Result<ProductId> {
        let cf = self.cf(cf::META)?;
        let mut seq = self.lock(&self.next_product_id)?;

        let id = *seq;
        *seq += 1;
        self.db
            .put_cf(&cf, NEXT_PRODUCT_ID_KEY, seq.to_be_bytes())
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(ProductId::new(id))
    }

    fn put_product(&self, product: &Product) -> Result<()> {
        let cf_products = self.cf(cf::PRODUCTS)?;
        let cf_index = self.cf(cf::PRODUCTS_BY_CREATED)?;

        let key = keys::product_key(product.id);
        let value = Self::serialize(product)?;

        let mut batch = WriteBatch::default();

        // On update with a changed creation timestamp, drop the stale index
        // entry so the product is not listed twice.
        if let Some(previous) = self.get_product(product.id)? {
            if previous.created_at != product.created_at {
                batch.delete_cf(
                    &cf_index,
                    keys::created_index_key(previous.created_at, product.id),
                );
            }
        }

        batch.put_cf(&cf_products, &key, &value);
        batch.put_cf(
            &cf_index,
            keys::created_index_key(product.created_at, product.id),
            [],
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let cf = self.cf(cf::PRODUCTS)?;
        let key = keys::product_key(id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn delete_product(&self, id: ProductId) -> Result<()> {
        let product = self.get_product(id)?.ok_or(StoreError::NotFound)?;

        let cf_products = self.cf(cf::PRODUCTS)?;
        let cf_index = self.cf(cf::PRODUCTS_BY_CREATED)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_products, keys::product_key(id));
        batch.delete_cf(&cf_index, keys::created_index_key(product.created_at, id));

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn list_products(&self) -> Result<Vec<Product>> {
        self.scan_products(usize::MAX, |_| true)
    }

    fn list_products_by_kind(&self, kind: &str) -> Result<Vec<Product>> {
        self.scan_products(usize::MAX, |p| p.kind == kind)
    }

    fn list_available_products(&self) -> Result<Vec<Product>> {
        self.scan_products(usize::MAX, |p| p.available)
    }

    fn list_recent_products(&self, limit: usize) -> Result<Vec<Product>> {
        self.scan_products(limit, |_| true)
    }
}

impl StatisticsStore for RocksStore {
    fn put_statistics(&self, stats: &ProductStatistics) -> Result<()> {
        let cf = self.cf(cf::STATISTICS)?;
        let key = keys::statistics_key(stats.product_id);
        let value = Self::serialize(stats)?;

        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_statistics(&self, product_id: ProductId) -> Result<Option<ProductStatistics>> {
        let cf = self.cf(cf::STATISTICS)?;
        let key = keys::statistics_key(product_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn delete_statistics(&self, product_id: ProductId) -> Result<()> {
        let cf = self.cf(cf::STATISTICS)?;

        self.db
            .delete_cf(&cf, keys::statistics_key(product_id))
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn top_by(&self, metric: StatMetric, limit: usize) -> Result<Vec<ProductStatistics>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let cf = self.cf(cf::STATISTICS)?;
        let mut records = Vec::new();

        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            records.push(Self::deserialize::<ProductStatistics>(&value)?);
        }

        // Stable sort over ascending-key iteration: ties break by ascending
        // product id.
        records.sort_by(|a, b| Self::compare_by_metric(metric, a, b));
        records.truncate(limit);

        Ok(records)
    }

    fn record_view(&self, product_id: ProductId) -> Result<ProductStatistics> {
        self.update_statistics_with(product_id, |stats| stats.views += 1)
    }

    fn record_sale(&self, product_id: ProductId, quantity: u64) -> Result<ProductStatistics> {
        self.update_statistics_with(product_id, |stats| stats.sales += quantity)
    }

    fn record_download(&self, product_id: ProductId) -> Result<ProductStatistics> {
        self.update_statistics_with(product_id, |stats| stats.downloads += 1)
    }

    fn refresh_trending_scores(&self) -> Result<usize> {
        let cf = self.cf(cf::STATISTICS)?;
        // Holds off concurrent counter updates so the full-scan rewrite
        // can't clobber an increment committed mid-scan.
        let _guard = self.lock(&self.stats_lock)?;
        let now = Utc::now();

        let mut records = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            records.push(Self::deserialize::<ProductStatistics>(&value)?);
        }

        let mut batch = WriteBatch::default();
        let count = records.len();
        for mut stats in records {
            stats.trending_score = stats.score_at(now);
            batch.put_cf(
                &cf,
                keys::statistics_key(stats.product_id),
                Self::serialize(&stats)?,
            );
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(records = count, "Refreshed trending scores");

        Ok(count)
    }
}

impl RatingStore for RocksStore {
    fn put_rating(&self, rating: &Rating) -> Result<()> {
        let cf_ratings = self.cf(cf::RATINGS)?;
        let cf_by_product = self.cf(cf::RATINGS_BY_PRODUCT)?;
        let cf_unique = self.cf(cf::RATING_BY_PRODUCT_USER)?;

        let unique_key = keys::product_user_rating_key(rating.product_id, rating.user_id);
        let value = Self::serialize(rating)?;

        let mut batch = WriteBatch::default();

        // One rating per (user, product): replace any previous rating.
        let existing = self
            .db
            .get_cf(&cf_unique, &unique_key)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        if let Some(data) = existing {
            let old_id = Self::rating_id_from_value(&data)?;
            batch.delete_cf(&cf_ratings, keys::rating_key(old_id));
            batch.delete_cf(
                &cf_by_product,
                keys::product_rating_key(rating.product_id, old_id),
            );
        }

        batch.put_cf(&cf_ratings, keys::rating_key(rating.id), &value);
        batch.put_cf(
            &cf_by_product,
            keys::product_rating_key(rating.product_id, rating.id),
            [],
        );
        batch.put_cf(&cf_unique, &unique_key, rating.id.to_bytes());

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn delete_rating(&self, product_id: ProductId, user_id: UserId) -> Result<()> {
        let cf_ratings = self.cf(cf::RATINGS)?;
        let cf_by_product = self.cf(cf::RATINGS_BY_PRODUCT)?;
        let cf_unique = self.cf(cf::RATING_BY_PRODUCT_USER)?;

        let unique_key = keys::product_user_rating_key(product_id, user_id);
        let data = self
            .db
            .get_cf(&cf_unique, &unique_key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .ok_or(StoreError::NotFound)?;
        let rating_id = Self::rating_id_from_value(&data)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_ratings, keys::rating_key(rating_id));
        batch.delete_cf(&cf_by_product, keys::product_rating_key(product_id, rating_id));
        batch.delete_cf(&cf_unique, &unique_key);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn rating_for_user(&self, product_id: ProductId, user_id: UserId) -> Result<Option<Rating>> {
        let cf_ratings = self.cf(cf::RATINGS)?;
        let cf_unique = self.cf(cf::RATING_BY_PRODUCT_USER)?;

        let unique_key = keys::product_user_rating_key(product_id, user_id);
        let Some(data) = self
            .db
            .get_cf(&cf_unique, &unique_key)
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };
        let rating_id = Self::rating_id_from_value(&data)?;

        self.db
            .get_cf(&cf_ratings, keys::rating_key(rating_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_ratings(&self, product_id: ProductId) -> Result<Vec<Rating>> {
        let cf_ratings = self.cf(cf::RATINGS)?;
        let cf_by_product = self.cf(cf::RATINGS_BY_PRODUCT)?;
        let prefix = keys::product_ratings_prefix(product_id);

        let mut ratings = Vec::new();
        let iter = self.db.iterator_cf(
            &cf_by_product,
            IteratorMode::From(&prefix, Direction::Forward),
        );

        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            if !key.starts_with(&prefix) {
                break;
            }

            let rating_id = keys::extract_rating_id_from_product_key(&key);
            let data = self
                .db
                .get_cf(&cf_ratings, keys::rating_key(rating_id))
                .map_err(|e| StoreError::Database(e.to_string()))?;
            if let Some(data) = data {
                ratings.push(Self::deserialize(&data)?);
            }
        }

        Ok(ratings)
    }

    #[allow(clippy::cast_precision_loss)]
    fn average_rating(&self, product_id: ProductId) -> Result<f64> {
        let ratings = self.list_ratings(product_id)?;
        if ratings.is_empty() {
            return Ok(0.0);
        }

        let sum: u64 = ratings.iter().map(|r| u64::from(r.score)).sum();
        Ok(sum as f64 / ratings.len() as f64)
    }

    fn rating_count(&self, product_id: ProductId) -> Result<u64> {
        Ok(self.list_ratings(product_id)?.len() as u64)
    }

    fn delete_ratings_for_product(&self, product_id: ProductId) -> Result<u64> {
        let cf_ratings = self.cf(cf::RATINGS)?;
        let cf_by_product = self.cf(cf::RATINGS_BY_PRODUCT)?;
        let cf_unique = self.cf(cf::RATING_BY_PRODUCT_USER)?;

        let ratings = self.list_ratings(product_id)?;

        let mut batch = WriteBatch::default();
        for rating in &ratings {
            batch.delete_cf(&cf_ratings, keys::rating_key(rating.id));
            batch.delete_cf(
                &cf_by_product,
                keys::product_rating_key(product_id, rating.id),
            );
            batch.delete_cf(
                &cf_unique,
                keys::product_user_rating_key(product_id, rating.user_id),
            );
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(ratings.len() as u64)
    }
}

impl FavoriteStore for RocksStore {
    fn add_favorite(&self, favorite: &Favorite) -> Result<bool> {
        let cf_favorites = self.cf(cf::FAVORITES)?;
        let cf_by_product = self.cf(cf::FAVORITES_BY_PRODUCT)?;
        let cf_stats = self.cf(cf::STATISTICS)?;

        let key = keys::favorite_key(favorite.user_id, favorite.product_id);

        // The duplicate check and the counter bump must see a consistent
        // statistics record, so the whole operation runs under the lock.
        let _guard = self.lock(&self.stats_lock)?;

        // Duplicate insert is a silent no-op; the counter must not move.
        let exists = self
            .db
            .get_cf(&cf_favorites, &key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();
        if exists {
            return Ok(false);
        }

        let now = Utc::now();
        let mut stats = self
            .get_statistics(favorite.product_id)?
            .unwrap_or_else(|| ProductStatistics::zeroed(favorite.product_id, now));
        stats.favorites += 1;
        stats.last_updated = now;
        stats.trending_score = stats.score_at(now);

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_favorites, &key, Self::serialize(favorite)?);
        batch.put_cf(
            &cf_by_product,
            keys::product_favorite_key(favorite.product_id, favorite.user_id),
            [],
        );
        batch.put_cf(
            &cf_stats,
            keys::statistics_key(favorite.product_id),
            Self::serialize(&stats)?,
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(true)
    }

    fn remove_favorite(&self, user_id: UserId, product_id: ProductId) -> Result<bool> {
        let cf_favorites = self.cf(cf::FAVORITES)?;
        let cf_by_product = self.cf(cf::FAVORITES_BY_PRODUCT)?;
        let cf_stats = self.cf(cf::STATISTICS)?;

        let key = keys::favorite_key(user_id, product_id);

        let _guard = self.lock(&self.stats_lock)?;

        let exists = self
            .db
            .get_cf(&cf_favorites, &key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();
        if !exists {
            return Ok(false);
        }

        let now = Utc::now();
        let mut stats = self
            .get_statistics(product_id)?
            .unwrap_or_else(|| ProductStatistics::zeroed(product_id, now));
        stats.favorites = stats.favorites.saturating_sub(1);
        stats.last_updated = now;
        stats.trending_score = stats.score_at(now);

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_favorites, &key);
        batch.delete_cf(
            &cf_by_product,
            keys::product_favorite_key(product_id, user_id),
        );
        batch.put_cf(
            &cf_stats,
            keys::statistics_key(product_id),
            Self::serialize(&stats)?,
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(true)
    }

    fn is_favorite(&self, user_id: UserId, product_id: ProductId) -> Result<bool> {
        let cf = self.cf(cf::FAVORITES)?;
        let key = keys::favorite_key(user_id, product_id);

        let exists = self
            .db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();

        Ok(exists)
    }

    fn favorite_count(&self, product_id: ProductId) -> Result<u64> {
        let cf = self.cf(cf::FAVORITES_BY_PRODUCT)?;
        let prefix = keys::product_favorites_prefix(product_id);

        let mut count = 0;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward));

        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            count += 1;
        }

        Ok(count)
    }

    fn list_favorites_by_user(&self, user_id: UserId) -> Result<Vec<Favorite>> {
        let cf = self.cf(cf::FAVORITES)?;
        let prefix = keys::user_favorites_prefix(user_id);

        let mut favorites = Vec::new();
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward));

        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            favorites.push(Self::deserialize(&value)?);
        }

        Ok(favorites)
    }

    fn delete_favorites_for_product(&self, product_id: ProductId) -> Result<u64> {
        let cf_favorites = self.cf(cf::FAVORITES)?;
        let cf_by_product = self.cf(cf::FAVORITES_BY_PRODUCT)?;
        let prefix = keys::product_favorites_prefix(product_id);

        let mut batch = WriteBatch::default();
        let mut removed = 0;

        let iter = self
            .db
            .iterator_cf(&cf_by_product, IteratorMode::From(&prefix, Direction::Forward));

        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }

            let user_id = keys::extract_user_id_from_product_favorite_key(&key);
            batch.delete_cf(&cf_favorites, keys::favorite_key(user_id, product_id));
            batch.delete_cf(&cf_by_product, key);
            removed += 1;
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resina_core::NewProduct;
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn draft(name: &str) -> NewProduct {
        NewProduct {
            name: name.into(),
            kind: "Joyas".into(),
            price_cents: 2500,
            quantity: 1,
            description: "test".into(),
            image_url: None,
            available: true,
            owner: UserId::new(1),
        }
    }

    fn insert_product(store: &RocksStore, name: &str) -> Product {
        let id = store.next_product_id().unwrap();
        let product = draft(name).into_product(id, Utc::now());
        store.put_product(&product).unwrap();
        product
    }

    #[test]
    fn product_crud() {
        let (store, _dir) = create_test_store();

        let product = insert_product(&store, "Coaster");
        let retrieved = store.get_product(product.id).unwrap().unwrap();
        assert_eq!(retrieved.name, "Coaster");

        let mut updated = retrieved;
        updated.price_cents = 9900;
        store.put_product(&updated).unwrap();
        assert_eq!(
            store.get_product(product.id).unwrap().unwrap().price_cents,
            9900
        );

        store.delete_product(product.id).unwrap();
        assert!(store.get_product(product.id).unwrap().is_none());
        assert!(matches!(
            store.delete_product(product.id),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn listings_are_newest_first() {
        let (store, _dir) = create_test_store();

        let first = insert_product(&store, "First");
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = insert_product(&store, "Second");

        let all = store.list_products().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);

        let recent = store.list_recent_products(1).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, second.id);
    }

    #[test]
    fn kind_and_availability_filters() {
        let (store, _dir) = create_test_store();

        let mut lamp = draft("Lamp");
        lamp.kind = "Casa".into();
        let id = store.next_product_id().unwrap();
        store.put_product(&lamp.into_product(id, Utc::now())).unwrap();

        let mut ring = draft("Ring");
        ring.available = false;
        let id = store.next_product_id().unwrap();
        store.put_product(&ring.into_product(id, Utc::now())).unwrap();

        assert_eq!(store.list_products_by_kind("Casa").unwrap().len(), 1);
        assert_eq!(store.list_products_by_kind("Moda").unwrap().len(), 0);
        assert_eq!(store.list_available_products().unwrap().len(), 1);
    }

    #[test]
    fn id_sequence_resumes_after_reopen() {
        let dir = TempDir::new().unwrap();

        let last_id = {
            let store = RocksStore::open(dir.path()).unwrap();
            insert_product(&store, "A");
            insert_product(&store, "B").id
        };

        let store = RocksStore::open(dir.path()).unwrap();
        let next = store.next_product_id().unwrap();
        assert!(next.value() > last_id.value());
    }

    #[test]
    fn id_not_reused_after_delete_and_reopen() {
        let dir = TempDir::new().unwrap();

        let deleted_id = {
            let store = RocksStore::open(dir.path()).unwrap();
            insert_product(&store, "A");
            let doomed = insert_product(&store, "B");
            store.delete_product(doomed.id).unwrap();
            doomed.id
        };

        // The deleted id held the highest key; the persisted sequence must
        // still skip past it, or the new product would inherit the dead
        // product's ratings and favorites.
        let store = RocksStore::open(dir.path()).unwrap();
        let next = store.next_product_id().unwrap();
        assert!(next.value() > deleted_id.value());
    }

    #[test]
    fn concurrent_favorite_adds_keep_counter_consistent() {
        use std::sync::Barrier;

        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let product_id = ProductId::new(1);

        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|user| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    store
                        .add_favorite(&Favorite::new(UserId::new(user as u64), product_id))
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }

        let stats = store.get_statistics(product_id).unwrap().unwrap();
        assert_eq!(stats.favorites, threads as u64);
        assert_eq!(
            store.favorite_count(product_id).unwrap(),
            stats.favorites
        );
    }

    #[test]
    fn concurrent_views_are_all_counted() {
        use std::sync::Barrier;

        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let product_id = ProductId::new(2);

        let threads = 4;
        let views_each = 25;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..views_each {
                        store.record_view(product_id).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = store.get_statistics(product_id).unwrap().unwrap();
        assert_eq!(stats.views, (threads * views_each) as u64);
    }

    #[test]
    fn statistics_counters_and_score() {
        let (store, _dir) = create_test_store();
        let id = ProductId::new(7);

        // record_view on a missing record synthesizes zeros first.
        for _ in 0..10 {
            store.record_view(id).unwrap();
        }
        store.record_sale(id, 2).unwrap();
        let stats = store.record_download(id).unwrap();

        assert_eq!(stats.views, 10);
        assert_eq!(stats.sales, 2);
        assert_eq!(stats.downloads, 1);
        assert_eq!(stats.favorites, 0);
        // Fresh write: no decay yet.
        assert!((stats.trending_score - (0.3 * 10.0 + 0.2 * 2.0 + 0.1)).abs() < 1e-12);
    }

    #[test]
    fn favorite_add_is_idempotent_and_tracks_counter() {
        let (store, _dir) = create_test_store();
        let product_id = ProductId::new(3);
        let user = UserId::new(11);

        assert!(store.add_favorite(&Favorite::new(user, product_id)).unwrap());
        assert!(!store.add_favorite(&Favorite::new(user, product_id)).unwrap());

        assert_eq!(store.favorite_count(product_id).unwrap(), 1);
        let stats = store.get_statistics(product_id).unwrap().unwrap();
        assert_eq!(stats.favorites, 1);

        assert!(store.remove_favorite(user, product_id).unwrap());
        assert!(!store.remove_favorite(user, product_id).unwrap());

        assert_eq!(store.favorite_count(product_id).unwrap(), 0);
        let stats = store.get_statistics(product_id).unwrap().unwrap();
        assert_eq!(stats.favorites, 0);
    }

    #[test]
    fn rating_upsert_replaces_previous() {
        let (store, _dir) = create_test_store();
        let product_id = ProductId::new(5);
        let user = UserId::new(2);

        store
            .put_rating(&Rating::new(product_id, user, 2, None))
            .unwrap();
        store
            .put_rating(&Rating::new(product_id, user, 5, Some("better now".into())))
            .unwrap();

        assert_eq!(store.rating_count(product_id).unwrap(), 1);
        let rating = store.rating_for_user(product_id, user).unwrap().unwrap();
        assert_eq!(rating.score, 5);
        assert_eq!(rating.comment.as_deref(), Some("better now"));
    }

    #[test]
    fn rating_average() {
        let (store, _dir) = create_test_store();
        let product_id = ProductId::new(8);

        for (user, score) in [(1, 5), (2, 3), (3, 4)] {
            store
                .put_rating(&Rating::new(product_id, UserId::new(user), score, None))
                .unwrap();
        }

        assert_eq!(store.rating_count(product_id).unwrap(), 3);
        assert!((store.average_rating(product_id).unwrap() - 4.0).abs() < 1e-12);
        assert_eq!(store.average_rating(ProductId::new(99)).unwrap(), 0.0);
    }

    #[test]
    fn delete_rating_not_found() {
        let (store, _dir) = create_test_store();
        let result = store.delete_rating(ProductId::new(1), UserId::new(1));
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[test]
    fn top_by_sorts_descending_and_honors_limit() {
        let (store, _dir) = create_test_store();
        let now = Utc::now();

        for (id, views) in [(1u64, 5u64), (2, 50), (3, 20)] {
            let mut stats = ProductStatistics::zeroed(ProductId::new(id), now);
            stats.views = views;
            store.put_statistics(&stats).unwrap();
        }

        let top = store.top_by(StatMetric::Views, 2).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].product_id, ProductId::new(2));
        assert_eq!(top[1].product_id, ProductId::new(3));

        assert!(store.top_by(StatMetric::Views, 0).unwrap().is_empty());
    }

    #[test]
    fn top_by_ties_break_by_ascending_id() {
        let (store, _dir) = create_test_store();
        let now = Utc::now();

        for id in [4u64, 2, 9] {
            let mut stats = ProductStatistics::zeroed(ProductId::new(id), now);
            stats.sales = 7;
            store.put_statistics(&stats).unwrap();
        }

        let top = store.top_by(StatMetric::Sales, 10).unwrap();
        let ids: Vec<u64> = top.iter().map(|s| s.product_id.value()).collect();
        assert_eq!(ids, vec![2, 4, 9]);
    }

    #[test]
    fn refresh_decays_stale_scores() {
        let (store, _dir) = create_test_store();
        let now = Utc::now();

        let mut stats = ProductStatistics::zeroed(ProductId::new(1), now);
        stats.views = 10;
        stats.favorites = 4;
        stats.sales = 2;
        stats.downloads = 1;
        stats.trending_score = 5.1;
        stats.last_updated = now - chrono::Duration::hours(24);
        store.put_statistics(&stats).unwrap();

        let refreshed = store.refresh_trending_scores().unwrap();
        assert_eq!(refreshed, 1);

        let stats = store.get_statistics(ProductId::new(1)).unwrap().unwrap();
        assert!((stats.trending_score - 2.55).abs() < 0.01);
        // The refresh must not count as activity.
        assert!(stats.last_updated <= now);
    }
}
