//! Inventory domain module.
//!
//! Stock records and the rules for creating and mutating them, implemented as
//! plain domain logic (no IO, no HTTP, no storage).

pub mod item;

pub use item::{InventoryItem, InventoryItemId, NewInventoryItem, validate_quantity};
