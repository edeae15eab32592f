//! Craftability rule.
//!
//! A recipe is craftable when every ingredient resolves to an existing item
//! whose stock covers `amount_needed`. Ingredients are checked in recipe order
//! and the first one that fails is reported.

use std::collections::HashMap;

use larder_inventory::{InventoryItem, InventoryItemId};

use crate::recipe::{Ingredient, Recipe};

/// Outcome of checking one ingredient against the stock it references.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Availability {
    Sufficient,
    /// The referenced item does not exist (dangling weak reference).
    Missing,
    Insufficient { have: i64, need: u32 },
}

impl Availability {
    pub fn assess(ingredient: &Ingredient, item: Option<&InventoryItem>) -> Self {
        match item {
            None => Availability::Missing,
            Some(item) if item.covers(ingredient.amount_needed) => Availability::Sufficient,
            Some(item) => Availability::Insufficient {
                have: item.quantity,
                need: ingredient.amount_needed,
            },
        }
    }

    pub fn is_sufficient(&self) -> bool {
        matches!(self, Availability::Sufficient)
    }
}

/// Read-only view of current stock, keyed by item id.
pub trait StockView {
    fn item(&self, id: InventoryItemId) -> Option<&InventoryItem>;
}

/// Lookup results: `None` records an id that resolved to nothing. Ids never
/// looked up read as missing too.
pub type ResolvedStock = HashMap<InventoryItemId, Option<InventoryItem>>;

impl StockView for ResolvedStock {
    fn item(&self, id: InventoryItemId) -> Option<&InventoryItem> {
        self.get(&id).and_then(Option::as_ref)
    }
}

/// First ingredient (in recipe order) that the stock cannot cover.
pub fn first_shortfall<V>(recipe: &Recipe, stock: &V) -> Option<(Ingredient, Availability)>
where
    V: StockView + ?Sized,
{
    recipe.ingredients.iter().find_map(|ingredient| {
        let availability = Availability::assess(ingredient, stock.item(ingredient.inventory_id));
        (!availability.is_sufficient()).then_some((*ingredient, availability))
    })
}
