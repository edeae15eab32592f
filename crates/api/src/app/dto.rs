use serde::{Deserialize, Serialize};

use larder_infra::RecipeAvailability;
use larder_recipes::Recipe;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

/// The id stays a string so a malformed value maps to a 400 of our own.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CraftRequest {
    pub recipe_id: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct CraftResponse {
    pub success: bool,
}

/// Recipe fields plus the computed `craftable` flag, flattened into one object.
#[derive(Debug, Serialize)]
pub struct RecipeView {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub craftable: bool,
}

impl From<RecipeAvailability> for RecipeView {
    fn from(value: RecipeAvailability) -> Self {
        Self {
            recipe: value.recipe,
            craftable: value.craftable,
        }
    }
}
