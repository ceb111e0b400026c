//! API Routes
//!
//! Configures the Axum router with all admin endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_handler, entry_handler, health_handler, invalidate_handler,
    keys_handler, set_handler, stats_handler, warm_up_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /stats` - Cache statistics
/// - `GET /keys` - List stored keys
/// - `PUT /entries` - Write an entry
/// - `DELETE /entries` - Clear the cache
/// - `GET /entries/:key` - Inspect an entry (key must be percent-encoded)
/// - `DELETE /entries/:key` - Delete an entry
/// - `POST /invalidate` - Remove keys matching a regular expression
/// - `POST /warmup` - Seed a batch of entries
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/keys", get(keys_handler))
        .route("/entries", put(set_handler).delete(clear_handler))
        .route("/entries/:key", get(entry_handler).delete(delete_handler))
        .route("/invalidate", post(invalidate_handler))
        .route("/warmup", post(warm_up_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
