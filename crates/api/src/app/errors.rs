use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use larder_core::DomainError;
use larder_infra::{CatalogError, EvaluatorError, StoreError};

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Body that failed to parse or did not match the expected shape.
pub fn json_rejection_to_response(rejection: JsonRejection) -> Response {
    json_error(rejection.status(), "invalid_body", rejection.body_text())
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
    }
}

pub fn store_error_to_response(err: StoreError) -> Response {
    tracing::error!(error = %err, "catalog store failure");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", err.to_string())
}

pub fn catalog_error_to_response(err: CatalogError) -> Response {
    match err {
        CatalogError::Domain(e) => domain_error_to_response(e),
        CatalogError::Store(e) => store_error_to_response(e),
    }
}

pub fn evaluator_error_to_response(err: EvaluatorError) -> Response {
    match err {
        EvaluatorError::Store(e) => store_error_to_response(e),
    }
}

/// Parse a path or body id, or produce the 400 response for it.
pub fn parse_id<T>(raw: &str) -> Result<T, Response>
where
    T: std::str::FromStr<Err = DomainError>,
{
    raw.parse().map_err(domain_error_to_response)
}
