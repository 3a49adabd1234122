use crate::config::AppConfig;
use crate::errors::EngineResult;
use crate::market::catalog::MarketCatalog;
use chrono::NaiveDate;
use portable_atomic::{AtomicU64, Ordering};
use smallvec::SmallVec;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

// ── Market data ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionKind {
    Call,
    Put,
}

impl std::fmt::Display for OptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "CALL"),
            Self::Put => write!(f, "PUT"),
        }
    }
}

/// Sensitivities supplied by the dataset. Never computed here.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
}

/// Immutable description of a listed option. Shared read-only by every leg that references it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OptionContract {
    pub ticker: String,
    pub underlying: String,
    pub kind: OptionKind,
    pub strike: f64,
    pub expiry: NaiveDate,
    pub last_price: f64,
    /// Day change, percent
    pub change: f64,
    pub volume: u64,
    pub open_interest: u64,
    /// Implied volatility, annualized percent
    pub iv: f64,
    pub greeks: Greeks,
    /// Today's volume over its recent average
    pub volume_avg_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Compra,
    Venda,
    Neutro,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Compra => write!(f, "COMPRA"),
            Self::Venda => write!(f, "VENDA"),
            Self::Neutro => write!(f, "NEUTRO"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TechnicalIndicators {
    /// Distance from the moving average, percent
    pub kairi: f64,
    pub rsi7: f64,
    pub stoch_k: f64,
    pub stoch_d: f64,
    pub signal: Signal,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TickerData {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub high: f64,
    pub low: f64,
    pub volume: u64,
    /// Options notional traded today, BRL
    pub options_volume: u64,
    pub technicals: TechnicalIndicators,
}

// ── Strategy ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// +1 for BUY, -1 for SELL
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Self::Buy => 1.0,
            Self::Sell => -1.0,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// One buy/sell position of a strategy. The entry price is the contract's last price.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StrategyLeg {
    pub id: String,
    pub option: Arc<OptionContract>,
    pub side: Side,
    pub quantity: u32,
    /// What-if IV (percent). Falls back to the contract IV when unset or zero.
    pub simulated_iv: Option<f64>,
}

impl StrategyLeg {
    #[inline]
    pub fn effective_iv(&self) -> f64 {
        match self.simulated_iv {
            Some(iv) if iv > 0.0 => iv,
            _ => self.option.iv,
        }
    }

    #[inline]
    pub fn entry_price(&self) -> f64 {
        self.option.last_price
    }
}

/// Insertion-ordered leg list. Order is cosmetic; aggregation does not depend on it.
pub type LegList = SmallVec<[StrategyLeg; 4]>;

/// One point of the payoff curve. Values rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PayoffSample {
    pub price: f64,
    /// Aggregate profit at expiration (intrinsic)
    pub profit: f64,
    /// Aggregate mark-to-model profit at the chosen horizon
    pub theoretical: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct RiskSummary {
    /// Worst sampled at-expiration loss, as a positive number. 0 if never negative.
    pub max_risk: f64,
    /// Net seller of calls: loss is unbounded to the upside.
    pub unlimited_risk: bool,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PayoffProfile {
    pub samples: Vec<PayoffSample>,
    pub risk: RiskSummary,
}

// ── Session task messages ──

pub type Reply<T> = oneshot::Sender<EngineResult<T>>;

/// Commands INTO the strategy task (bounded channel). Each carries its own reply.
#[derive(Debug)]
pub enum StrategyCommand {
    AddLeg {
        option_ticker: String,
        side: Side,
        quantity: Option<u32>,
        reply: Reply<StrategySnapshot>,
    },
    RemoveLeg {
        id: String,
        reply: Reply<StrategySnapshot>,
    },
    SetSimulatedIv {
        id: String,
        iv: Option<f64>,
        reply: Reply<StrategySnapshot>,
    },
    SetDaysToExpiry {
        days: u32,
        reply: Reply<StrategySnapshot>,
    },
    SelectUnderlying {
        symbol: String,
        reply: Reply<StrategySnapshot>,
    },
    Clear {
        reply: Reply<StrategySnapshot>,
    },
    Shutdown,
}

// ── Messages OUT of the strategy task ──

#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type")]
pub enum WsMessage {
    #[serde(rename = "strategy_update")]
    StrategyUpdate(StrategySnapshot),

    #[serde(rename = "analysis")]
    Analysis { text: String, timestamp: String },
}

/// Latest strategy state for the dashboard (sent via watch channel).
#[derive(Debug, Clone, serde::Serialize)]
pub struct StrategySnapshot {
    pub underlying: String,
    pub spot: f64,
    pub days_to_expiry: u32,
    pub risk_free_rate: f64,
    pub legs: Vec<StrategyLeg>,
    pub profile: PayoffProfile,
    pub updated_at: String,
}

// ── Performance Counters (lock-free) ──

pub struct PerfCounters {
    pub commands_processed: AtomicU64,
    pub recomputations: AtomicU64,
    pub rejected_commands: AtomicU64,
    pub analyses_requested: AtomicU64,
    pub analyses_failed: AtomicU64,
    pub ws_messages_sent: AtomicU64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self {
            commands_processed: AtomicU64::new(0),
            recomputations: AtomicU64::new(0),
            rejected_commands: AtomicU64::new(0),
            analyses_requested: AtomicU64::new(0),
            analyses_failed: AtomicU64::new(0),
            ws_messages_sent: AtomicU64::new(0),
        }
    }
}

// ── Application shared state (channels, not locks) ──

pub struct AppState {
    pub config: AppConfig,
    pub catalog: Arc<MarketCatalog>,

    // Strategy task -> Dashboard: latest snapshot
    pub snapshot_tx: watch::Sender<StrategySnapshot>,
    pub snapshot_rx: watch::Receiver<StrategySnapshot>,

    // Strategy task -> Dashboard: event stream (broadcast for WS clients)
    pub ws_tx: broadcast::Sender<WsMessage>,

    // HTTP handlers -> Strategy task: bounded command channel
    pub strategy_tx: mpsc::Sender<StrategyCommand>,

    pub narrative: crate::analysis::gemini::NarrativeClient,

    // Lock-free performance counters
    pub counters: PerfCounters,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        catalog: Arc<MarketCatalog>,
        initial: StrategySnapshot,
        strategy_tx: mpsc::Sender<StrategyCommand>,
    ) -> Arc<Self> {
        let (ws_tx, _) = broadcast::channel(256);
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);
        let narrative = crate::analysis::gemini::NarrativeClient::new(&config);

        Arc::new(Self {
            config,
            catalog,
            snapshot_tx,
            snapshot_rx,
            ws_tx,
            strategy_tx,
            narrative,
            counters: PerfCounters::new(),
        })
    }

    #[inline]
    pub fn broadcast(&self, msg: WsMessage) {
        self.counters.ws_messages_sent.fetch_add(1, Ordering::Relaxed);
        let _ = self.ws_tx.send(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(iv: f64) -> Arc<OptionContract> {
        Arc::new(OptionContract {
            ticker: "PETRL385".into(),
            underlying: "PETR4".into(),
            kind: OptionKind::Call,
            strike: 38.5,
            expiry: NaiveDate::from_ymd_opt(2024, 12, 20).unwrap(),
            last_price: 1.25,
            change: 15.4,
            volume: 1_250_000,
            open_interest: 4_500_000,
            iv,
            greeks: Greeks { delta: 0.52, gamma: 0.12, theta: -0.04, vega: 0.08 },
            volume_avg_ratio: 4.8,
        })
    }

    #[test]
    fn test_effective_iv_fallback() {
        let mut leg = StrategyLeg {
            id: "a".into(),
            option: contract(32.5),
            side: Side::Buy,
            quantity: 100,
            simulated_iv: None,
        };
        assert_eq!(leg.effective_iv(), 32.5);
        leg.simulated_iv = Some(0.0);
        assert_eq!(leg.effective_iv(), 32.5);
        leg.simulated_iv = Some(40.0);
        assert_eq!(leg.effective_iv(), 40.0);
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_value(contract(32.5).as_ref()).unwrap();
        assert_eq!(json["kind"], "CALL");
        assert_eq!(json["expiry"], "2024-12-20");
        assert_eq!(serde_json::to_value(Side::Sell).unwrap(), "SELL");
        assert_eq!(Signal::Compra.to_string(), "COMPRA");
    }

    #[test]
    fn test_side_sign() {
        assert_eq!(Side::Buy.sign(), 1.0);
        assert_eq!(Side::Sell.sign(), -1.0);
    }
}
