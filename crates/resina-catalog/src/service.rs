//! The product aggregation service.
//!
//! `CatalogService` is the single place where a caller-facing product view
//! is assembled from the four leaf stores, and where popularity rankings are
//! exposed. It holds read-only references to the stores and mutates them
//! only through their dedicated operations.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::Stream;
use tokio::sync::watch;

use resina_core::{
    EnrichedProduct, Favorite, NewProduct, Product, ProductId, ProductStatistics, Rating, UserId,
};
use resina_store::{Result, RocksStore, StatMetric, Store, StoreError};

use crate::config::CatalogConfig;
use crate::stream::snapshot_stream;

/// The aggregation service composing products, statistics, ratings, and
/// favorites into enriched product views.
///
/// Cloning is cheap; clones share the same store and revision channel.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
    changes: watch::Sender<u64>,
    default_top_limit: usize,
}

impl CatalogService {
    /// Open the catalog over a `RocksDB` store at the configured data
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open(config: &CatalogConfig) -> Result<Self> {
        let store = RocksStore::open(&config.data_dir)?;
        Ok(Self::with_store(
            Arc::new(store),
            config.default_top_limit,
        ))
    }

    /// Create the service over an already-open store.
    #[must_use]
    pub fn with_store(store: Arc<dyn Store>, default_top_limit: usize) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            store,
            changes,
            default_top_limit,
        }
    }

    /// Bump the revision so active snapshot streams re-emit.
    fn touch(&self) {
        self.changes.send_modify(|revision| *revision += 1);
    }

    // =========================================================================
    // Catalog reads
    // =========================================================================

    /// All products, newest first, enriched for the given viewer.
    ///
    /// # Errors
    ///
    /// Returns an error if any store lookup fails; a failing enrichment
    /// lookup fails the whole list rather than substituting defaults.
    pub fn get_all(&self, viewer: UserId) -> Result<Vec<EnrichedProduct>> {
        self.enrich_all(viewer, self.store.list_products()?)
    }

    /// Products with the given category tag, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if any store lookup fails.
    pub fn get_by_kind(&self, viewer: UserId, kind: &str) -> Result<Vec<EnrichedProduct>> {
        self.enrich_all(viewer, self.store.list_products_by_kind(kind)?)
    }

    /// Available products, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if any store lookup fails.
    pub fn get_available(&self, viewer: UserId) -> Result<Vec<EnrichedProduct>> {
        self.enrich_all(viewer, self.store.list_available_products()?)
    }

    /// A single enriched product, or `None` if no such product exists.
    ///
    /// # Errors
    ///
    /// Returns an error if any store lookup fails.
    pub fn get_by_id(&self, viewer: UserId, id: ProductId) -> Result<Option<EnrichedProduct>> {
        match self.store.get_product(id)? {
            Some(product) => Ok(Some(self.enrich(viewer, product, None)?)),
            None => Ok(None),
        }
    }

    /// All ratings of a product, oldest first (the detail screen's comment
    /// list).
    ///
    /// # Errors
    ///
    /// Returns an error if the store lookup fails.
    pub fn ratings(&self, product_id: ProductId) -> Result<Vec<Rating>> {
        self.store.list_ratings(product_id)
    }

    /// A user's own rating of a product, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lookup fails.
    pub fn rating_of(&self, user: UserId, product_id: ProductId) -> Result<Option<Rating>> {
        self.store.rating_for_user(product_id, user)
    }

    /// A user's favorites, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lookup fails.
    pub fn favorites_of(&self, user: UserId) -> Result<Vec<Favorite>> {
        self.store.list_favorites_by_user(user)
    }

    // =========================================================================
    // Rankings
    // =========================================================================

    /// Top products by sales. `None` limit means the configured default;
    /// a zero limit returns an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if any store lookup fails.
    pub fn top_by_sales(
        &self,
        viewer: UserId,
        limit: Option<usize>,
    ) -> Result<Vec<EnrichedProduct>> {
        self.top_by(viewer, StatMetric::Sales, limit)
    }

    /// Top products by views.
    ///
    /// # Errors
    ///
    /// Returns an error if any store lookup fails.
    pub fn top_by_views(
        &self,
        viewer: UserId,
        limit: Option<usize>,
    ) -> Result<Vec<EnrichedProduct>> {
        self.top_by(viewer, StatMetric::Views, limit)
    }

    /// Top products by favorite count.
    ///
    /// # Errors
    ///
    /// Returns an error if any store lookup fails.
    pub fn top_by_favorites(
        &self,
        viewer: UserId,
        limit: Option<usize>,
    ) -> Result<Vec<EnrichedProduct>> {
        self.top_by(viewer, StatMetric::Favorites, limit)
    }

    /// Top products by stored trending score.
    ///
    /// # Errors
    ///
    /// Returns an error if any store lookup fails.
    pub fn top_trending(
        &self,
        viewer: UserId,
        limit: Option<usize>,
    ) -> Result<Vec<EnrichedProduct>> {
        self.top_by(viewer, StatMetric::Trending, limit)
    }

    /// Most recently created products.
    ///
    /// # Errors
    ///
    /// Returns an error if any store lookup fails.
    pub fn most_recent(
        &self,
        viewer: UserId,
        limit: Option<usize>,
    ) -> Result<Vec<EnrichedProduct>> {
        let limit = limit.unwrap_or(self.default_top_limit);
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.enrich_all(viewer, self.store.list_recent_products(limit)?)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Insert a new product and unconditionally initialize a zeroed
    /// statistics record for it, so no read can observe the record missing
    /// once the insert returns.
    ///
    /// The two writes are not transactional; readers tolerate the crash
    /// window by synthesizing zero statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if a store write fails.
    pub fn insert(&self, draft: NewProduct) -> Result<Product> {
        let id = self.store.next_product_id()?;
        let now = Utc::now();
        let product = draft.into_product(id, now);

        self.store.put_product(&product)?;
        self.store
            .put_statistics(&ProductStatistics::zeroed(id, now))?;

        tracing::debug!(product_id = %id, name = %product.name, "Inserted product");
        self.touch();
        Ok(product)
    }

    /// Update a product record in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub fn update(&self, product: &Product) -> Result<()> {
        self.store.put_product(product)?;
        self.touch();
        Ok(())
    }

    /// Delete a product, cascading to its statistics, ratings, and
    /// favorites. Rankings still tolerate orphan statistics rows left by
    /// legacy data or a crash between the cascade steps.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the product doesn't exist.
    pub fn delete(&self, id: ProductId) -> Result<()> {
        self.store.delete_product(id)?;
        self.store.delete_statistics(id)?;
        let ratings = self.store.delete_ratings_for_product(id)?;
        let favorites = self.store.delete_favorites_for_product(id)?;

        tracing::info!(
            product_id = %id,
            ratings_removed = ratings,
            favorites_removed = favorites,
            "Deleted product"
        );
        self.touch();
        Ok(())
    }

    /// Register one detail view for a product. Called opportunistically by
    /// detail screens alongside `get_by_id`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the product doesn't exist, or an
    /// error if the store write fails.
    pub fn register_view(&self, id: ProductId) -> Result<()> {
        self.require_product(id)?;
        self.store.record_view(id)?;
        self.touch();
        Ok(())
    }

    /// Record `quantity` sales for a product (sales are reported by an
    /// external checkout flow).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the product doesn't exist, or an
    /// error if the store write fails.
    pub fn record_sale(&self, id: ProductId, quantity: u64) -> Result<()> {
        self.require_product(id)?;
        self.store.record_sale(id, quantity)?;
        self.touch();
        Ok(())
    }

    /// Record one download for a product.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the product doesn't exist, or an
    /// error if the store write fails.
    pub fn record_download(&self, id: ProductId) -> Result<()> {
        self.require_product(id)?;
        self.store.record_download(id)?;
        self.touch();
        Ok(())
    }

    /// Counter updates address live products only; the store would happily
    /// synthesize an orphan statistics row otherwise.
    fn require_product(&self, id: ProductId) -> Result<()> {
        self.store.get_product(id)?.ok_or(StoreError::NotFound)?;
        Ok(())
    }

    /// Mark a product as a favorite of the user. A duplicate add is a
    /// silent no-op. Returns whether the favorite was newly added.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub fn add_favorite(&self, user: UserId, product_id: ProductId) -> Result<bool> {
        let added = self.store.add_favorite(&Favorite::new(user, product_id))?;
        if added {
            self.touch();
        }
        Ok(added)
    }

    /// Remove a user's favorite. Returns whether a favorite was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub fn remove_favorite(&self, user: UserId, product_id: ProductId) -> Result<bool> {
        let removed = self.store.remove_favorite(user, product_id)?;
        if removed {
            self.touch();
        }
        Ok(removed)
    }

    /// Submit a rating with an optional comment, replacing any previous
    /// rating by the same user for the same product. Scores are expected in
    /// 1-5 and validated by the input layer, not here.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub fn rate(
        &self,
        user: UserId,
        product_id: ProductId,
        score: u8,
        comment: Option<String>,
    ) -> Result<Rating> {
        let rating = Rating::new(product_id, user, score, comment);
        self.store.put_rating(&rating)?;
        self.touch();
        Ok(rating)
    }

    /// Delete a user's rating of a product.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no such rating exists.
    pub fn delete_rating(&self, user: UserId, product_id: ProductId) -> Result<()> {
        self.store.delete_rating(product_id, user)?;
        self.touch();
        Ok(())
    }

    /// Recompute every stored trending score with decay as of now. Intended
    /// to be run periodically by the host application. Returns the number
    /// of records rewritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub fn refresh_trending_scores(&self) -> Result<usize> {
        let refreshed = self.store.refresh_trending_scores()?;
        self.touch();
        Ok(refreshed)
    }

    // =========================================================================
    // Snapshot streams
    // =========================================================================

    /// Stream of full-catalog snapshots for the viewer: one immediately,
    /// one after every mutation.
    pub fn watch_all(&self, viewer: UserId) -> impl Stream<Item = Result<Vec<EnrichedProduct>>> {
        let service = self.clone();
        snapshot_stream(self.changes.subscribe(), move || service.get_all(viewer))
    }

    /// Stream of by-kind snapshots for the viewer.
    pub fn watch_by_kind(
        &self,
        viewer: UserId,
        kind: String,
    ) -> impl Stream<Item = Result<Vec<EnrichedProduct>>> {
        let service = self.clone();
        snapshot_stream(self.changes.subscribe(), move || {
            service.get_by_kind(viewer, &kind)
        })
    }

    /// Stream of available-only snapshots for the viewer.
    pub fn watch_available(
        &self,
        viewer: UserId,
    ) -> impl Stream<Item = Result<Vec<EnrichedProduct>>> {
        let service = self.clone();
        snapshot_stream(self.changes.subscribe(), move || {
            service.get_available(viewer)
        })
    }

    /// Stream of favorite counts for a product.
    pub fn watch_favorite_count(&self, product_id: ProductId) -> impl Stream<Item = Result<u64>> {
        let service = self.clone();
        snapshot_stream(self.changes.subscribe(), move || {
            service.store.favorite_count(product_id)
        })
    }

    // =========================================================================
    // Enrichment
    // =========================================================================

    /// Ranking query: top statistics joined against the product store.
    /// A statistics row whose product was deleted is silently skipped.
    fn top_by(
        &self,
        viewer: UserId,
        metric: StatMetric,
        limit: Option<usize>,
    ) -> Result<Vec<EnrichedProduct>> {
        let limit = limit.unwrap_or(self.default_top_limit);
        let ranked = self.store.top_by(metric, limit)?;

        let mut products = Vec::with_capacity(ranked.len());
        for stats in ranked {
            let Some(product) = self.store.get_product(stats.product_id)? else {
                continue;
            };
            products.push(self.enrich(viewer, product, Some(stats))?);
        }

        Ok(products)
    }

    fn enrich_all(&self, viewer: UserId, products: Vec<Product>) -> Result<Vec<EnrichedProduct>> {
        products
            .into_iter()
            .map(|product| self.enrich(viewer, product, None))
            .collect()
    }

    /// Join one product with its statistics, rating aggregates, and the
    /// viewer's favorite membership. A missing statistics record counts as
    /// all-zero; any failing lookup propagates.
    fn enrich(
        &self,
        viewer: UserId,
        product: Product,
        stats: Option<ProductStatistics>,
    ) -> Result<EnrichedProduct> {
        let stats = match stats {
            Some(stats) => stats,
            None => self
                .store
                .get_statistics(product.id)?
                .unwrap_or_else(|| ProductStatistics::zeroed(product.id, Utc::now())),
        };

        let average_rating = self.store.average_rating(product.id)?;
        let rating_count = self.store.rating_count(product.id)?;
        let favorite_count = self.store.favorite_count(product.id)?;
        let is_favorite = self.store.is_favorite(viewer, product.id)?;

        Ok(EnrichedProduct {
            product,
            average_rating,
            rating_count,
            favorite_count,
            views: stats.views,
            is_favorite,
        })
    }
}
