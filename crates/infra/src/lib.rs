//! Infrastructure layer: persistence backends and the services built on them.

pub mod catalog;
pub mod crafting;
pub mod store;

pub use catalog::{Catalog, CatalogError};
pub use crafting::{
    CraftOutcome, CraftReceipt, EvaluatorError, RecipeAvailability, RecipeEvaluator, StockChange,
};
pub use store::{CatalogStore, CatalogTransaction, InMemoryCatalogStore, PostgresCatalogStore, StoreError};
