use axum::http::StatusCode;

pub async fn root() -> &'static str {
    "working server"
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}
