use serde::{Deserialize, Serialize};
use uuid::Uuid;

use larder_core::{DomainError, DomainResult, Entity, impl_uuid_newtype};

/// Inventory item identifier.
///
/// Recipes hold this as a weak reference: the id says nothing about whether
/// the item still exists.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventoryItemId(Uuid);

impl_uuid_newtype!(InventoryItemId, "InventoryItemId");

/// A stock record.
///
/// `quantity` is signed: crafting does not clamp at zero, so a craft run
/// against insufficient stock leaves a negative balance behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: InventoryItemId,
    pub name: String,
    pub category: String,
    pub image: String,
    pub quantity: i64,
}

impl InventoryItem {
    /// Whether this item can cover `needed` units for one craft.
    ///
    /// An empty (or overdrawn) item never covers anything, even a zero request.
    pub fn covers(&self, needed: u32) -> bool {
        self.quantity > 0 && self.quantity >= i64::from(needed)
    }

    /// Remove `amount` units and return the new balance. May go negative.
    pub fn consume(&mut self, amount: u32) -> i64 {
        self.quantity -= i64::from(amount);
        self.quantity
    }
}

impl Entity for InventoryItem {
    type Id = InventoryItemId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Input for creating an inventory item (no id yet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInventoryItem {
    pub image: String,
    pub name: String,
    pub category: String,
    pub quantity: i64,
}

impl NewInventoryItem {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.category.trim().is_empty() {
            return Err(DomainError::validation("category cannot be empty"));
        }
        validate_quantity(self.quantity)
    }

    /// Validate and assign an identifier.
    pub fn into_item(self, id: InventoryItemId) -> DomainResult<InventoryItem> {
        self.validate()?;
        Ok(InventoryItem {
            id,
            name: self.name,
            category: self.category,
            image: self.image,
            quantity: self.quantity,
        })
    }
}

/// Quantities set by hand (creation, administrative update) must be non-negative.
pub fn validate_quantity(quantity: i64) -> DomainResult<()> {
    if quantity < 0 {
        return Err(DomainError::validation("quantity cannot be negative"));
    }
    Ok(())
}
