//! Shared test harness for catalog integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use resina_catalog::CatalogService;
use resina_core::{NewProduct, UserId};
use resina_store::RocksStore;
use tempfile::TempDir;

/// A catalog service over a throwaway database, with direct store access
/// for seeding edge-case state.
pub struct TestCatalog {
    pub service: CatalogService,
    pub store: Arc<RocksStore>,
    _dir: TempDir,
}

impl TestCatalog {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let service = CatalogService::with_store(store.clone(), 20);
        Self {
            service,
            store,
            _dir: dir,
        }
    }
}

pub fn draft(name: &str, kind: &str) -> NewProduct {
    NewProduct {
        name: name.into(),
        kind: kind.into(),
        price_cents: 1500,
        quantity: 2,
        description: format!("{name} description"),
        image_url: None,
        available: true,
        owner: UserId::new(1),
    }
}
