use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use larder_infra::CraftOutcome;
use larder_recipes::{NewRecipe, RecipeId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_recipes).post(create_recipe))
        .route("/craft", post(craft))
        .route("/:id", get(get_recipe).delete(delete_recipe))
}

pub async fn create_recipe(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<NewRecipe>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(v) => v,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services.catalog().create_recipe(body).await {
        Ok(recipe) => (StatusCode::CREATED, Json(recipe)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

/// Every recipe with its `craftable` flag. Any store failure fails the whole list.
pub async fn list_recipes(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.evaluator().list_with_availability().await {
        Ok(listed) => {
            let body: Vec<dto::RecipeView> = listed.into_iter().map(Into::into).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::evaluator_error_to_response(e),
    }
}

pub async fn get_recipe(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: RecipeId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog().get_recipe(id).await {
        Ok(recipe) => (StatusCode::OK, Json(recipe)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn delete_recipe(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: RecipeId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog().delete_recipe(id).await {
        Ok(recipe) => (StatusCode::OK, Json(recipe)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

/// Craft once. An unknown recipe id still answers `{"success": true}`.
pub async fn craft(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CraftRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(v) => v,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    let id: RecipeId = match errors::parse_id(&body.recipe_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.evaluator().craft(id).await {
        Ok(CraftOutcome::Crafted(_) | CraftOutcome::RecipeNotFound) => {
            (StatusCode::OK, Json(dto::CraftResponse { success: true })).into_response()
        }
        Err(e) => errors::evaluator_error_to_response(e),
    }
}
