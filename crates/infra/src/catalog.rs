//! Catalog CRUD: validate with the domain crates, persist through the store.

use thiserror::Error;

use larder_core::DomainError;
use larder_inventory::{InventoryItem, InventoryItemId, NewInventoryItem, validate_quantity};
use larder_recipes::{NewRecipe, Recipe, RecipeId};

use crate::store::{CatalogStore, StoreError};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Inventory and recipe records over any `CatalogStore`.
#[derive(Debug, Clone)]
pub struct Catalog<S> {
    store: S,
}

impl<S> Catalog<S>
where
    S: CatalogStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn create_item(&self, input: NewInventoryItem) -> Result<InventoryItem, CatalogError> {
        let item = input.into_item(InventoryItemId::new())?;
        self.store.insert_item(item.clone()).await?;
        tracing::info!(item_id = %item.id, name = %item.name, quantity = item.quantity, "inventory item created");
        Ok(item)
    }

    pub async fn list_items(&self) -> Result<Vec<InventoryItem>, CatalogError> {
        Ok(self.store.list_items().await?)
    }

    /// Administrative stock update.
    pub async fn set_item_quantity(&self, id: InventoryItemId, quantity: i64) -> Result<InventoryItem, CatalogError> {
        validate_quantity(quantity)?;
        let updated = self
            .store
            .update_inventory_quantity(id, quantity)
            .await?
            .ok_or_else(DomainError::not_found)?;
        tracing::info!(item_id = %id, quantity, "inventory quantity set");
        Ok(updated)
    }

    /// Returns the removed item. Recipes referencing it keep the dangling id.
    pub async fn delete_item(&self, id: InventoryItemId) -> Result<InventoryItem, CatalogError> {
        let deleted = self.store.delete_item(id).await?.ok_or_else(DomainError::not_found)?;
        tracing::info!(item_id = %id, "inventory item deleted");
        Ok(deleted)
    }

    pub async fn create_recipe(&self, input: NewRecipe) -> Result<Recipe, CatalogError> {
        let recipe = input.into_recipe(RecipeId::new())?;
        self.store.insert_recipe(recipe.clone()).await?;
        tracing::info!(
            recipe_id = %recipe.id,
            name = %recipe.name,
            ingredients = recipe.ingredients.len(),
            "recipe created"
        );
        Ok(recipe)
    }

    pub async fn get_recipe(&self, id: RecipeId) -> Result<Recipe, CatalogError> {
        Ok(self.store.get_recipe(id).await?.ok_or_else(DomainError::not_found)?)
    }

    pub async fn delete_recipe(&self, id: RecipeId) -> Result<Recipe, CatalogError> {
        let deleted = self.store.delete_recipe(id).await?.ok_or_else(DomainError::not_found)?;
        tracing::info!(recipe_id = %id, "recipe deleted");
        Ok(deleted)
    }
}
