//! Recipe evaluation: craftability listing and the craft transaction.
//!
//! ## Listing
//!
//! `list_with_availability` walks every recipe in catalog order. Each recipe's
//! ingredient items are resolved into a per-call memo, then checked with
//! [`first_shortfall`]. An item shared by many recipes is fetched once. Any
//! store failure aborts the whole listing.
//!
//! ## Crafting
//!
//! `craft` runs inside one store transaction:
//!
//! ```text
//! begin
//!   ↓
//! 1. Load recipe (unknown id → no-op success)
//!   ↓
//! 2. amount += 1
//!   ↓
//! 3. Lock every ingredient item at once (ascending id order)
//!   ↓
//! 4. For each ingredient: quantity -= amount_needed
//!    (missing item → skipped)
//!   ↓
//! 5. Write each touched item's final quantity
//!   ↓
//! commit
//! ```
//!
//! Stock is not re-checked before crafting and quantities are not clamped, so
//! crafting an uncraftable recipe drives stock negative. A failure at any step
//! drops the transaction and nothing is written.

use std::collections::BTreeMap;

use thiserror::Error;

use larder_inventory::{InventoryItem, InventoryItemId};
use larder_recipes::{Recipe, RecipeId, ResolvedStock, first_shortfall};

use crate::store::{CatalogStore, StoreError};

#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A recipe annotated with whether current stock covers one craft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeAvailability {
    pub recipe: Recipe,
    pub craftable: bool,
}

/// New balance of one item after a craft.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StockChange {
    pub item_id: InventoryItemId,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CraftReceipt {
    pub recipe_id: RecipeId,
    /// Craft counter after this craft.
    pub amount: u64,
    pub consumed: Vec<StockChange>,
    /// Ingredient references that did not resolve to an item.
    pub skipped: Vec<InventoryItemId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CraftOutcome {
    Crafted(CraftReceipt),
    /// No recipe with that id; nothing was written.
    RecipeNotFound,
}

#[derive(Debug, Clone)]
pub struct RecipeEvaluator<S> {
    store: S,
}

impl<S> RecipeEvaluator<S>
where
    S: CatalogStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn list_with_availability(&self) -> Result<Vec<RecipeAvailability>, EvaluatorError> {
        let recipes = self.store.list_recipes().await?;
        let mut resolved = ResolvedStock::new();
        let mut out = Vec::with_capacity(recipes.len());

        for recipe in recipes {
            for ingredient in &recipe.ingredients {
                let id = ingredient.inventory_id;
                if !resolved.contains_key(&id) {
                    let item = self.store.get_inventory_item(id).await?;
                    resolved.insert(id, item);
                }
            }

            let shortfall = first_shortfall(&recipe, &resolved);
            if let Some((ingredient, availability)) = shortfall {
                tracing::debug!(
                    recipe_id = %recipe.id,
                    inventory_id = %ingredient.inventory_id,
                    ?availability,
                    "recipe not craftable"
                );
            }

            out.push(RecipeAvailability {
                recipe,
                craftable: shortfall.is_none(),
            });
        }

        Ok(out)
    }

    pub async fn craft(&self, recipe_id: RecipeId) -> Result<CraftOutcome, EvaluatorError> {
        let mut tx = self.store.begin().await?;

        let Some(mut recipe) = tx.get_recipe(recipe_id).await? else {
            tracing::warn!(%recipe_id, "craft requested for unknown recipe; nothing to do");
            return Ok(CraftOutcome::RecipeNotFound);
        };

        let amount = recipe.record_craft();
        tx.update_recipe_amount(recipe.id, amount).await?;

        let ids: Vec<InventoryItemId> = recipe.ingredients.iter().map(|i| i.inventory_id).collect();
        let mut stock: BTreeMap<InventoryItemId, InventoryItem> = tx
            .lock_inventory_items(&ids)
            .await?
            .into_iter()
            .map(|item| (item.id, item))
            .collect();

        let mut consumed = Vec::with_capacity(recipe.ingredients.len());
        let mut skipped = Vec::new();

        for ingredient in &recipe.ingredients {
            match stock.get_mut(&ingredient.inventory_id) {
                Some(item) => {
                    let quantity = item.consume(ingredient.amount_needed);
                    consumed.push(StockChange { item_id: item.id, quantity });
                }
                None => {
                    tracing::debug!(
                        %recipe_id,
                        inventory_id = %ingredient.inventory_id,
                        "ingredient references a missing item; skipping"
                    );
                    skipped.push(ingredient.inventory_id);
                }
            }
        }

        for item in stock.values() {
            tx.update_inventory_quantity(item.id, item.quantity).await?;
            if item.quantity < 0 {
                tracing::warn!(
                    %recipe_id,
                    inventory_id = %item.id,
                    quantity = item.quantity,
                    "craft left inventory overdrawn"
                );
            }
        }

        tx.commit().await?;

        tracing::info!(
            %recipe_id,
            amount,
            consumed = consumed.len(),
            skipped = skipped.len(),
            "recipe crafted"
        );

        Ok(CraftOutcome::Crafted(CraftReceipt {
            recipe_id,
            amount,
            consumed,
            skipped,
        }))
    }
}
