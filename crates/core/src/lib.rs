//! `larder-core`: shared building blocks for the catalog domain crates.
//!
//! Pure types only: identifiers, the entity trait and the domain error model.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};

#[doc(hidden)]
pub use uuid as __uuid;
