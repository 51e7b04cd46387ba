//! HTTP API route definitions.

use axum::{handler::Handler, middleware, routing::get, Router};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use super::handlers::{cache_info, health, not_found, root, AppState};
use super::middleware::{cors_layer, handle_panic, parse_json_body};
use crate::metrics::track_requests;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/", get(root).fallback(not_found))
        .route("/health", get(health).fallback(not_found))
        .route("/cache-info", get(cache_info).fallback(not_found))
        .route_layer(middleware::from_fn(track_requests))
        .fallback(not_found.layer(middleware::from_fn(track_requests)))
        .with_state(state);

    with_middleware(routes)
}

/// Wrap a router in the request pipeline.
///
/// Outermost first: CORS, request tracing, panic recovery, JSON body
/// parsing. CORS sits outside everything so error responses carry the
/// headers too.
pub fn with_middleware(router: Router) -> Router {
    router
        .layer(middleware::from_fn(parse_json_body))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}
