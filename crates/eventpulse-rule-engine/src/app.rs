use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

pub fn build_router(ready: bool) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(move || ready_handler(ready)))
}

async fn health() -> &'static str {
    "ok"
}

async fn ready_handler(ready: bool) -> Response {
    if ready {
        (StatusCode::OK, "ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not-ready").into_response()
    }
}
