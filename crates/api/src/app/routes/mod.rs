use axum::{Router, routing::get};

pub mod inventory;
pub mod recipes;
pub mod system;

/// Router for every endpoint.
pub fn router() -> Router {
    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .nest("/inventory", inventory::router())
        .nest("/recipes", recipes::router())
}
