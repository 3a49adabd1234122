//! Dashboard views derived from the market snapshot.
//! All functions are pure -- they take market data and return computed rows.

use crate::state::{OptionContract, Signal, TickerData};
use std::sync::Arc;

/// Volume/average ratio above which the scanner flags an option.
pub const SCANNER_RATIO: f64 = 2.0;

/// Stricter ratio for the options sent to the narrative analysis.
pub const ANALYSIS_RATIO: f64 = 2.5;

const HIGH_LIQUIDITY_BRL: u64 = 800_000_000;
const MEDIUM_LIQUIDITY_BRL: u64 = 200_000_000;

/// Options trading above `min_ratio` times their average volume, most unusual first.
pub fn atypical_options(options: &[Arc<OptionContract>], min_ratio: f64) -> Vec<Arc<OptionContract>> {
    let mut flagged: Vec<_> = options
        .iter()
        .filter(|o| o.volume_avg_ratio > min_ratio)
        .cloned()
        .collect();
    flagged.sort_by(|a, b| b.volume_avg_ratio.total_cmp(&a.volume_avg_ratio));
    flagged
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Liquidity {
    Alta,
    Media,
    Baixa,
}

impl Liquidity {
    pub fn from_options_volume(brl: u64) -> Self {
        if brl > HIGH_LIQUIDITY_BRL {
            Self::Alta
        } else if brl > MEDIUM_LIQUIDITY_BRL {
            Self::Media
        } else {
            Self::Baixa
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct VolumeRow {
    pub rank: usize,
    pub symbol: String,
    pub options_volume: u64,
    pub options_volume_label: String,
    pub change_percent: f64,
    pub liquidity: Liquidity,
    /// Bar length relative to the most traded underlying, 0..=100
    pub share_of_leader: f64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct VolumeRanking {
    pub rows: Vec<VolumeRow>,
    pub total: u64,
    pub total_label: String,
}

/// Underlyings ranked by options notional, with liquidity tiers.
pub fn volume_ranking(tickers: &[TickerData]) -> VolumeRanking {
    let mut sorted: Vec<&TickerData> = tickers.iter().collect();
    sorted.sort_by(|a, b| b.options_volume.cmp(&a.options_volume));

    let leader = sorted.first().map(|t| t.options_volume).unwrap_or(0);
    let total: u64 = sorted.iter().map(|t| t.options_volume).sum();

    let rows = sorted
        .into_iter()
        .enumerate()
        .map(|(i, t)| VolumeRow {
            rank: i + 1,
            symbol: t.symbol.clone(),
            options_volume: t.options_volume,
            options_volume_label: format_brl_volume(t.options_volume),
            change_percent: t.change_percent,
            liquidity: Liquidity::from_options_volume(t.options_volume),
            share_of_leader: if leader == 0 {
                0.0
            } else {
                t.options_volume as f64 / leader as f64 * 100.0
            },
        })
        .collect();

    VolumeRanking {
        rows,
        total,
        total_label: format_brl_volume(total),
    }
}

/// Compact BRL label: "R$ 1.25B", "R$ 890M", "R$ 950".
pub fn format_brl_volume(brl: u64) -> String {
    if brl >= 1_000_000_000 {
        format!("R$ {:.2}B", brl as f64 / 1e9)
    } else if brl >= 1_000_000 {
        format!("R$ {:.0}M", brl as f64 / 1e6)
    } else {
        format!("R$ {brl}")
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TechnicalSignal {
    pub symbol: String,
    pub price: f64,
    pub signal: Signal,
    pub kairi: f64,
    pub rsi7: f64,
    pub stoch_k: f64,
    /// Strike to sell, projected back to the moving average
    pub target_strike: f64,
    pub suggestion: String,
}

/// Underlyings with a directional signal and the credit spread it suggests.
pub fn technical_signals(tickers: &[TickerData]) -> Vec<TechnicalSignal> {
    tickers
        .iter()
        .filter(|t| t.technicals.signal != Signal::Neutro)
        .map(|t| {
            let target_strike = t.price * (1.0 + t.technicals.kairi / 100.0);
            let structure = match t.technicals.signal {
                Signal::Compra => "Bull Put Spread ou Trava de Alta",
                _ => "Bear Call Spread ou Trava de Baixa",
            };
            TechnicalSignal {
                symbol: t.symbol.clone(),
                price: t.price,
                signal: t.technicals.signal,
                kairi: t.technicals.kairi,
                rsi7: t.technicals.rsi7,
                stoch_k: t.technicals.stoch_k,
                target_strike,
                suggestion: format!(
                    "Sugestão: Montar {structure}. Alvo de strike vendido sugerido: R$ {target_strike:.2}"
                ),
            }
        })
        .collect()
}
