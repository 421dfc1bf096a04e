//! Route configuration.

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::auth_middleware;
use crate::handlers;
use crate::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/{repository}", get(handlers::browse_repository))
        .route(
            "/{repository}/{*gav}",
            get(handlers::get_artifact)
                .head(handlers::head_artifact)
                .put(handlers::deploy_artifact)
                .delete(handlers::delete_artifact),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
