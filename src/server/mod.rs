pub mod routes;
pub mod ws;

use crate::state::AppState;
use axum::routing::{delete, get, post, put};
use std::sync::Arc;

/// JSON API + WS stream, with the prebuilt dashboard served for every other path.
pub fn router(state: Arc<AppState>) -> axum::Router {
    let dashboard = &state.config.dashboard_dir;
    let static_files = tower_http::services::ServeDir::new(dashboard)
        .fallback(tower_http::services::ServeFile::new(dashboard.join("index.html")));

    axum::Router::new()
        .route("/api/tickers", get(routes::get_tickers))
        .route("/api/options", get(routes::get_options))
        .route("/api/scanner", get(routes::get_scanner))
        .route("/api/volume", get(routes::get_volume))
        .route("/api/signals", get(routes::get_signals))
        .route("/api/strategy", get(routes::get_strategy))
        .route("/api/strategy/legs", post(routes::add_leg).delete(routes::clear_legs))
        .route("/api/strategy/legs/{id}", delete(routes::remove_leg))
        .route("/api/strategy/legs/{id}/iv", put(routes::set_leg_iv))
        .route("/api/strategy/horizon", put(routes::set_horizon))
        .route("/api/strategy/underlying", put(routes::select_underlying))
        .route("/api/analysis", post(routes::post_analysis))
        .route("/api/counters", get(routes::get_counters))
        .route("/ws", get(ws::ws_handler))
        .fallback_service(static_files)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(state)
}
