use serde::{Deserialize, Serialize};
use uuid::Uuid;

use larder_core::{DomainError, DomainResult, Entity, impl_uuid_newtype};
use larder_inventory::InventoryItemId;

/// Recipe identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeId(Uuid);

impl_uuid_newtype!(RecipeId, "RecipeId");

/// One line of a recipe: which item, and how many units a single craft uses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub inventory_id: InventoryItemId,
    pub amount_needed: u32,
}

/// A recipe and its craft counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    pub description: String,
    pub image: String,
    /// Number of successful crafts so far.
    pub amount: u64,
    pub ingredients: Vec<Ingredient>,
}

impl Recipe {
    /// Bump the craft counter and return the new value.
    pub fn record_craft(&mut self) -> u64 {
        self.amount += 1;
        self.amount
    }
}

impl Entity for Recipe {
    type Id = RecipeId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Input for creating a recipe. The craft counter always starts at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecipe {
    pub image: String,
    pub name: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
}

impl NewRecipe {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if let Some(pos) = self.ingredients.iter().position(|i| i.amount_needed == 0) {
            return Err(DomainError::validation(format!(
                "ingredient {pos}: amountNeeded must be positive"
            )));
        }
        Ok(())
    }

    pub fn into_recipe(self, id: RecipeId) -> DomainResult<Recipe> {
        self.validate()?;
        Ok(Recipe {
            id,
            name: self.name,
            description: self.description,
            image: self.image,
            amount: 0,
            ingredients: self.ingredients,
        })
    }
}
