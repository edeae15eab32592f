//! Recipe domain module.
//!
//! Recipes reference inventory items by id and say how much of each one a
//! single craft consumes. This crate owns the craftability rule; resolving the
//! references against a store is the infra layer's job.

pub mod availability;
pub mod recipe;

pub use availability::{Availability, ResolvedStock, StockView, first_shortfall};
pub use recipe::{Ingredient, NewRecipe, Recipe, RecipeId};
