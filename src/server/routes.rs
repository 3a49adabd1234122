use crate::analysis::gemini::{EMPTY_FALLBACK, ERROR_FALLBACK};
use crate::errors::EngineError;
use crate::market::catalog::MarketData;
use crate::market::scanner::{self, SCANNER_RATIO};
use crate::state::{AppState, Reply, Side, StrategyCommand, StrategySnapshot, WsMessage};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use std::sync::Arc;
use tokio::sync::oneshot;

#[derive(serde::Deserialize)]
pub struct OptionsQuery {
    pub underlying: Option<String>,
}

#[derive(serde::Deserialize)]
pub struct AddLegRequest {
    pub option_ticker: String,
    pub side: Side,
    pub quantity: Option<u32>,
}

#[derive(serde::Deserialize)]
pub struct IvRequest {
    pub iv: Option<f64>,
}

#[derive(serde::Deserialize)]
pub struct HorizonRequest {
    pub days: u32,
}

#[derive(serde::Deserialize)]
pub struct UnderlyingRequest {
    pub symbol: String,
}

/// GET /api/tickers
pub async fn get_tickers(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "tickers": state.catalog.tickers() }))
}

/// GET /api/options -- optionally filtered by underlying
pub async fn get_options(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OptionsQuery>,
) -> Json<serde_json::Value> {
    let options: Vec<_> = match params.underlying.as_deref() {
        Some(u) => state.catalog.options_for(u).cloned().collect(),
        None => state.catalog.options().to_vec(),
    };
    Json(serde_json::json!({ "options": options }))
}

/// GET /api/scanner -- unusual option volume
pub async fn get_scanner(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let atypical = scanner::atypical_options(state.catalog.options(), SCANNER_RATIO);
    Json(serde_json::json!({ "threshold": SCANNER_RATIO, "options": atypical }))
}

/// GET /api/volume -- underlyings ranked by options notional
pub async fn get_volume(State(state): State<Arc<AppState>>) -> Json<scanner::VolumeRanking> {
    Json(scanner::volume_ranking(state.catalog.tickers()))
}

/// GET /api/signals -- non-neutral technical signals
pub async fn get_signals(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "signals": scanner::technical_signals(state.catalog.tickers()) }))
}

/// GET /api/strategy -- current strategy snapshot (from watch channel, no lock)
pub async fn get_strategy(State(state): State<Arc<AppState>>) -> Json<StrategySnapshot> {
    let snapshot = state.snapshot_rx.borrow().clone();
    Json(snapshot)
}

/// POST /api/strategy/legs
pub async fn add_leg(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddLegRequest>,
) -> Response {
    dispatch(&state, |reply| StrategyCommand::AddLeg {
        option_ticker: req.option_ticker,
        side: req.side,
        quantity: req.quantity,
        reply,
    })
    .await
}

/// DELETE /api/strategy/legs/{id}
pub async fn remove_leg(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    dispatch(&state, |reply| StrategyCommand::RemoveLeg { id, reply }).await
}

/// PUT /api/strategy/legs/{id}/iv
pub async fn set_leg_iv(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<IvRequest>,
) -> Response {
    dispatch(&state, |reply| StrategyCommand::SetSimulatedIv { id, iv: req.iv, reply }).await
}

/// DELETE /api/strategy/legs
pub async fn clear_legs(State(state): State<Arc<AppState>>) -> Response {
    dispatch(&state, |reply| StrategyCommand::Clear { reply }).await
}

/// PUT /api/strategy/horizon
pub async fn set_horizon(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HorizonRequest>,
) -> Response {
    dispatch(&state, |reply| StrategyCommand::SetDaysToExpiry { days: req.days, reply }).await
}

/// PUT /api/strategy/underlying
pub async fn select_underlying(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UnderlyingRequest>,
) -> Response {
    dispatch(&state, |reply| StrategyCommand::SelectUnderlying { symbol: req.symbol, reply }).await
}

/// POST /api/analysis -- narrative commentary. Always 200; failures carry fallback text.
pub async fn post_analysis(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    use portable_atomic::Ordering::Relaxed;
    state.counters.analyses_requested.fetch_add(1, Relaxed);

    let flagged = scanner::atypical_options(state.catalog.options(), SCANNER_RATIO);
    let text = state.narrative.analyze(&flagged, state.catalog.tickers()).await;
    if text == ERROR_FALLBACK || text == EMPTY_FALLBACK {
        state.counters.analyses_failed.fetch_add(1, Relaxed);
    }

    let timestamp = chrono::Utc::now().to_rfc3339();
    state.broadcast(WsMessage::Analysis {
        text: text.clone(),
        timestamp: timestamp.clone(),
    });
    Json(serde_json::json!({ "text": text, "timestamp": timestamp }))
}

/// GET /api/counters -- performance counters (lock-free reads)
pub async fn get_counters(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    use portable_atomic::Ordering::Relaxed;
    Json(serde_json::json!({
        "commands_processed": state.counters.commands_processed.load(Relaxed),
        "recomputations": state.counters.recomputations.load(Relaxed),
        "rejected_commands": state.counters.rejected_commands.load(Relaxed),
        "analyses_requested": state.counters.analyses_requested.load(Relaxed),
        "analyses_failed": state.counters.analyses_failed.load(Relaxed),
        "ws_messages_sent": state.counters.ws_messages_sent.load(Relaxed),
    }))
}

/// Send a command to the strategy task and turn its reply into a response.
async fn dispatch<F>(state: &AppState, build: F) -> Response
where
    F: FnOnce(Reply<StrategySnapshot>) -> StrategyCommand,
{
    let (reply, rx) = oneshot::channel();
    if state.strategy_tx.send(build(reply)).await.is_err() {
        return error_response(EngineError::ChannelClosed("strategy task".into()));
    }
    match rx.await {
        Ok(Ok(snapshot)) => Json(snapshot).into_response(),
        Ok(Err(e)) => error_response(e),
        Err(_) => error_response(EngineError::ChannelClosed("strategy reply".into())),
    }
}

fn error_response(e: EngineError) -> Response {
    let status = match &e {
        EngineError::Validation(_) => StatusCode::BAD_REQUEST,
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ChannelClosed(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": e.to_string() }))).into_response()
}
