//! Catalog persistence abstractions.
//!
//! `CatalogStore` is the persistence collaborator the services talk to. Plain
//! reads and single-record writes go straight through it. Anything that must
//! read and then write several records as one unit (crafting) goes through a
//! `CatalogTransaction` obtained from [`CatalogStore::begin`].
//!
//! ## Transaction contract
//!
//! - Reads made through a transaction see that transaction's own writes.
//! - Records read through a transaction stay locked against other
//!   transactions until it ends, so read-modify-write sequences do not lose
//!   updates.
//! - Inventory rows are locked in one call, in ascending id order. Two
//!   transactions needing overlapping items therefore queue instead of
//!   deadlocking, whatever order their recipes list the items in.
//! - Nothing is visible to other callers until `commit` succeeds. Dropping the
//!   handle without committing discards every write.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use larder_inventory::{InventoryItem, InventoryItemId};
use larder_recipes::{Recipe, RecipeId};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryCatalogStore;
pub use postgres::PostgresCatalogStore;

/// Storage failure (infrastructure, not domain).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connectivity, SQL or other backend failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// A stored value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The write conflicts with current state (duplicate id, record gone mid-transaction).
    #[error("conflict: {0}")]
    Conflict(String),
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_item(&self, item: InventoryItem) -> Result<(), StoreError>;

    /// All items, oldest first.
    async fn list_items(&self) -> Result<Vec<InventoryItem>, StoreError>;

    async fn get_inventory_item(&self, id: InventoryItemId) -> Result<Option<InventoryItem>, StoreError>;

    /// Overwrite an item's quantity. Returns the updated item, or `None` if it does not exist.
    async fn update_inventory_quantity(
        &self,
        id: InventoryItemId,
        quantity: i64,
    ) -> Result<Option<InventoryItem>, StoreError>;

    /// Remove an item and return it. Recipes referencing it are left as they are.
    async fn delete_item(&self, id: InventoryItemId) -> Result<Option<InventoryItem>, StoreError>;

    async fn insert_recipe(&self, recipe: Recipe) -> Result<(), StoreError>;

    /// All recipes, oldest first.
    async fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError>;

    async fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, StoreError>;

    async fn delete_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, StoreError>;

    /// Open a transaction handle.
    async fn begin(&self) -> Result<Box<dyn CatalogTransaction>, StoreError>;
}

#[async_trait]
pub trait CatalogTransaction: Send {
    async fn get_recipe(&mut self, id: RecipeId) -> Result<Option<Recipe>, StoreError>;

    /// Load and lock the given items, ascending by id. Ids with no item are
    /// left out of the result. Duplicate ids are allowed.
    async fn lock_inventory_items(&mut self, ids: &[InventoryItemId]) -> Result<Vec<InventoryItem>, StoreError>;

    async fn update_recipe_amount(&mut self, id: RecipeId, amount: u64) -> Result<(), StoreError>;

    async fn update_inventory_quantity(&mut self, id: InventoryItemId, quantity: i64) -> Result<(), StoreError>;

    /// Make every write visible. The handle is finished afterwards.
    async fn commit(&mut self) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    async fn insert_item(&self, item: InventoryItem) -> Result<(), StoreError> {
        (**self).insert_item(item).await
    }

    async fn list_items(&self) -> Result<Vec<InventoryItem>, StoreError> {
        (**self).list_items().await
    }

    async fn get_inventory_item(&self, id: InventoryItemId) -> Result<Option<InventoryItem>, StoreError> {
        (**self).get_inventory_item(id).await
    }

    async fn update_inventory_quantity(
        &self,
        id: InventoryItemId,
        quantity: i64,
    ) -> Result<Option<InventoryItem>, StoreError> {
        (**self).update_inventory_quantity(id, quantity).await
    }

    async fn delete_item(&self, id: InventoryItemId) -> Result<Option<InventoryItem>, StoreError> {
        (**self).delete_item(id).await
    }

    async fn insert_recipe(&self, recipe: Recipe) -> Result<(), StoreError> {
        (**self).insert_recipe(recipe).await
    }

    async fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError> {
        (**self).list_recipes().await
    }

    async fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
        (**self).get_recipe(id).await
    }

    async fn delete_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
        (**self).delete_recipe(id).await
    }

    async fn begin(&self) -> Result<Box<dyn CatalogTransaction>, StoreError> {
        (**self).begin().await
    }
}
