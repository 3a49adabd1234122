mod analysis;
mod config;
mod errors;
mod market;
mod models;
mod risk;
mod server;
mod state;
mod strategy;

use crate::market::catalog::MarketCatalog;
use crate::state::{AppState, StrategyCommand};
use crate::strategy::session::StrategySession;
use std::sync::Arc;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("b3 options desk starting");

    // Load config
    let cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    if cfg.gemini_api_key.is_empty() {
        tracing::warn!("GEMINI_API_KEY not set; analysis requests will return the fallback message");
    }

    let catalog = Arc::new(MarketCatalog::sample());

    let session = match StrategySession::new(
        catalog.clone(),
        &cfg.default_underlying,
        cfg.default_days_to_expiry,
        cfg.risk_free_rate,
        cfg.default_quantity,
    ) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("strategy session error: {e}");
            std::process::exit(1);
        }
    };

    // Bounded command channel into the strategy task
    let (strategy_tx, strategy_rx) = mpsc::channel::<StrategyCommand>(64);

    let app_state = AppState::new(cfg.clone(), catalog, session.snapshot(), strategy_tx.clone());

    // Strategy task (sole owner of the leg set)
    let engine_state = app_state.clone();
    let engine = tokio::spawn(async move {
        strategy::engine::run_strategy_engine(session, engine_state, strategy_rx).await;
    });

    // Axum HTTP + WS server
    let app = server::router(app_state);
    let addr = format!("0.0.0.0:{}", cfg.server_port);
    tracing::info!("server listening on {addr}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("bind error: {e}");
            std::process::exit(1);
        }
    };

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("ctrl-c received, shutting down");
    };

    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
        tracing::error!("server error: {e}");
    }

    let _ = strategy_tx.send(StrategyCommand::Shutdown).await;
    let _ = engine.await;
}
