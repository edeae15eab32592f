use std::sync::Arc;

use larder_infra::{
    Catalog, CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, RecipeEvaluator, StoreError,
};

use crate::config::StorageConfig;

/// Store handle shared by every service.
pub type SharedStore = Arc<dyn CatalogStore>;

/// Everything the handlers need, behind one `Extension`.
#[derive(Clone)]
pub struct AppServices {
    catalog: Catalog<SharedStore>,
    evaluator: RecipeEvaluator<SharedStore>,
}

impl AppServices {
    pub fn new(store: SharedStore) -> Self {
        Self {
            catalog: Catalog::new(store.clone()),
            evaluator: RecipeEvaluator::new(store),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryCatalogStore::new()))
    }

    pub fn catalog(&self) -> &Catalog<SharedStore> {
        &self.catalog
    }

    pub fn evaluator(&self) -> &RecipeEvaluator<SharedStore> {
        &self.evaluator
    }
}

pub async fn build_services(storage: &StorageConfig) -> Result<AppServices, StoreError> {
    match storage {
        StorageConfig::InMemory => {
            tracing::info!("using in-memory catalog store");
            Ok(AppServices::in_memory())
        }
        StorageConfig::Postgres { database_url } => {
            let store = PostgresCatalogStore::connect(database_url).await?;
            tracing::info!("using postgres catalog store");
            Ok(AppServices::new(Arc::new(store)))
        }
    }
}
