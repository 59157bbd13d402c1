use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all DataWeave endpoints.
pub fn build_router(state: AppState) -> Router {
    let cors = if state.config.permissive_cors {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route(
            "/v1/provenance",
            get(handler::list_records).post(handler::create_record),
        )
        .route("/v1/provenance/search", post(handler::search_records))
        .route("/v1/provenance/recent", get(handler::recent_records))
        .route("/v1/provenance/:id", get(handler::get_record))
        .route("/v1/provenance/:id/chain", get(handler::verify_chain))
        .route("/v1/provenance/:id/durable", get(handler::verify_durable))
        .route("/v1/stats", get(handler::statistics))
        .route("/v1/admin/audit", get(handler::audit))
        .route("/v1/admin/export", get(handler::export_ledger))
        .route("/v1/admin/import", post(handler::import_ledger))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
