use axum::Router;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{
    error::not_found,
    modules::{
        documents::init_documents_router, email::init_email_router, health::init_health_router,
    },
    state::AppState,
};

pub fn init_router(state: AppState) -> Router {
    Router::new()
        .merge(init_health_router())
        .nest(
            "/api",
            Router::new()
                .merge(init_documents_router())
                .merge(init_email_router()),
        )
        .fallback(not_found)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}
