pub mod landing;
pub mod records;

use axum::{
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;

use crate::metrics;
use crate::state::AppState;

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn metrics_text() -> (StatusCode, String) {
    metrics::encode_metrics()
}

/// Build the application router: landing page, ops endpoints and the record collection.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let collection = format!("/{}", state.schema.route);
    let item = format!("{collection}/:id");

    let ops = Router::new()
        .route("/", get(landing::index))
        .route("/health", get(health))
        .route("/metrics", get(metrics_text));

    let records = Router::new()
        .route(&collection, get(records::search).post(records::create))
        .route(
            &item,
            get(records::get_one)
                .put(records::replace)
                .patch(records::update)
                .delete(records::delete),
        );

    let trace = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
        .on_failure(DefaultOnFailure::new().level(Level::ERROR));

    ops.merge(records)
        .with_state(state)
        .layer(ServiceBuilder::new().layer(trace).layer(cors))
}
