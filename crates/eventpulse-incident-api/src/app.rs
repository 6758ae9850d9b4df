use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::api;
use crate::state::ApiState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "EventPulse Incident API",
        description = "Read surface over the projected incident timeline",
    ),
    tags(
        (name = "Incidents", description = "Incident state and timelines"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

pub fn build_router(state: ApiState) -> Router {
    let (router, spec) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(routes!(api::list_incidents))
        .routes(routes!(api::get_incident))
        .routes(routes!(api::health))
        .routes(routes!(api::ready))
        .split_for_parts();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let spec_json = serde_json::to_value(&spec).unwrap_or_default();
    router
        .route(
            "/v1/openapi.json",
            get(move || {
                let body = spec_json.clone();
                async move { Json(body) }
            }),
        )
        .with_state(state)
        .layer(cors)
}
