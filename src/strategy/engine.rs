use crate::errors::EngineResult;
use crate::state::{AppState, StrategyCommand, StrategySnapshot, WsMessage};
use crate::strategy::session::StrategySession;
use portable_atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Strategy task. Owns the session and applies commands one at a time, so the leg
/// set is never touched concurrently. Every accepted change resamples the payoff
/// curve and publishes it; rejected commands leave the session as it was.
pub async fn run_strategy_engine(
    mut session: StrategySession,
    state: Arc<AppState>,
    mut rx: mpsc::Receiver<StrategyCommand>,
) {
    tracing::info!(
        underlying = %session.underlying(),
        spot = session.spot(),
        days = session.days_to_expiry(),
        legs = session.legs().len(),
        "strategy task started"
    );

    while let Some(cmd) = rx.recv().await {
        if matches!(cmd, StrategyCommand::Shutdown) {
            tracing::info!("shutdown command received");
            break;
        }
        process_command(cmd, &mut session, &state);
    }

    tracing::info!("strategy task shutting down");
}

fn process_command(cmd: StrategyCommand, session: &mut StrategySession, state: &Arc<AppState>) {
    state.counters.commands_processed.fetch_add(1, Ordering::Relaxed);

    match cmd {
        StrategyCommand::AddLeg { option_ticker, side, quantity, reply } => {
            let result = session
                .add_leg(&option_ticker, side, quantity)
                .map(|_| publish(session, state));
            respond(reply, result, state);
        }
        StrategyCommand::RemoveLeg { id, reply } => {
            let result = session.remove_leg(&id).map(|_| publish(session, state));
            respond(reply, result, state);
        }
        StrategyCommand::SetSimulatedIv { id, iv, reply } => {
            let result = session.set_simulated_iv(&id, iv).map(|_| publish(session, state));
            respond(reply, result, state);
        }
        StrategyCommand::SetDaysToExpiry { days, reply } => {
            session.set_days_to_expiry(days);
            let snapshot = publish(session, state);
            respond(reply, Ok(snapshot), state);
        }
        StrategyCommand::SelectUnderlying { symbol, reply } => {
            let result = session.select_underlying(&symbol).map(|_| publish(session, state));
            respond(reply, result, state);
        }
        StrategyCommand::Clear { reply } => {
            session.clear();
            let snapshot = publish(session, state);
            respond(reply, Ok(snapshot), state);
        }
        StrategyCommand::Shutdown => {}
    }
}

/// Resample, then push the result to the watch channel and WS clients.
fn publish(session: &StrategySession, state: &Arc<AppState>) -> StrategySnapshot {
    let snapshot = session.snapshot();
    state.counters.recomputations.fetch_add(1, Ordering::Relaxed);

    let (risk_label, risk_value) = snapshot.profile.risk.headline();
    tracing::info!(
        underlying = %snapshot.underlying,
        legs = snapshot.legs.len(),
        days = snapshot.days_to_expiry,
        risk = %format!("{risk_label}: {risk_value}"),
        "strategy recomputed"
    );

    let _ = state.snapshot_tx.send(snapshot.clone());
    state.broadcast(WsMessage::StrategyUpdate(snapshot.clone()));
    snapshot
}

fn respond(
    reply: tokio::sync::oneshot::Sender<EngineResult<StrategySnapshot>>,
    result: EngineResult<StrategySnapshot>,
    state: &Arc<AppState>,
) {
    if let Err(e) = &result {
        state.counters.rejected_commands.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(error = %e, "strategy command rejected");
    }
    if reply.send(result).is_err() {
        tracing::debug!("strategy reply dropped: requester went away");
    }
}
