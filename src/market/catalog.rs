use crate::state::{
    Greeks, OptionContract, OptionKind, Signal, TechnicalIndicators, TickerData,
};
use chrono::NaiveDate;
use std::sync::Arc;

/// Lookup surface the strategy session and the scanners read market data through.
/// Implementations own their data; lookups never fail, they return None on a miss.
pub trait MarketData: Send + Sync {
    fn tickers(&self) -> &[TickerData];
    fn options(&self) -> &[Arc<OptionContract>];

    fn ticker(&self, symbol: &str) -> Option<&TickerData> {
        self.tickers().iter().find(|t| t.symbol == symbol)
    }

    fn option(&self, ticker: &str) -> Option<&Arc<OptionContract>> {
        self.options().iter().find(|o| o.ticker == ticker)
    }

    fn options_for<'a>(&'a self, underlying: &'a str) -> Box<dyn Iterator<Item = &'a Arc<OptionContract>> + 'a> {
        Box::new(self.options().iter().filter(move |o| o.underlying == underlying))
    }
}

/// In-memory market snapshot. Immutable after construction.
#[derive(Debug, Clone)]
pub struct MarketCatalog {
    tickers: Vec<TickerData>,
    options: Vec<Arc<OptionContract>>,
}

impl MarketData for MarketCatalog {
    fn tickers(&self) -> &[TickerData] {
        &self.tickers
    }

    fn options(&self) -> &[Arc<OptionContract>] {
        &self.options
    }
}

impl MarketCatalog {
    pub fn new(tickers: Vec<TickerData>, options: Vec<OptionContract>) -> Self {
        Self {
            tickers,
            options: options.into_iter().map(Arc::new).collect(),
        }
    }

    /// The bundled B3 sample dataset: ten most active underlyings and their flagged options.
    pub fn sample() -> Self {
        let tickers = vec![
            ticker("PETR4", 38.45, 0.55, 1.45, 38.90, 37.80, 45_000_000, 1_250_000_000, (2.4, 68.0, 82.0, 78.0, Signal::Neutro)),
            ticker("VALE3", 62.12, -1.20, -1.89, 63.50, 61.90, 32_000_000, 890_000_000, (-3.8, 22.0, 12.0, 15.0, Signal::Compra)),
            ticker("ITUB4", 34.20, 0.10, 0.29, 34.40, 34.10, 18_000_000, 450_000_000, (0.5, 52.0, 45.0, 48.0, Signal::Neutro)),
            ticker("BBAS3", 27.50, 0.45, 1.66, 27.80, 27.10, 12_000_000, 320_000_000, (1.1, 58.0, 65.0, 60.0, Signal::Neutro)),
            ticker("BBDC4", 14.85, -0.05, -0.34, 14.95, 14.75, 22_000_000, 210_000_000, (-1.2, 41.0, 30.0, 35.0, Signal::Neutro)),
            ticker("B3SA3", 11.20, -0.12, -1.06, 11.45, 11.15, 15_000_000, 185_000_000, (-2.1, 35.0, 25.0, 28.0, Signal::Neutro)),
            ticker("MGLU3", 1.85, 0.08, 4.52, 1.92, 1.82, 85_000_000, 155_000_000, (5.4, 75.0, 92.0, 88.0, Signal::Venda)),
            ticker("GGBR4", 24.15, -0.35, -1.43, 24.60, 24.05, 9_000_000, 110_000_000, (-1.5, 38.0, 40.0, 42.0, Signal::Neutro)),
            ticker("HAPV3", 3.75, 0.05, 1.35, 3.82, 3.68, 42_000_000, 85_000_000, (0.8, 55.0, 60.0, 58.0, Signal::Neutro)),
            ticker("ABEV3", 12.40, 0.15, 1.22, 12.50, 12.30, 15_000_000, 75_000_000, (4.1, 82.0, 88.0, 85.0, Signal::Venda)),
        ];

        let expiry = NaiveDate::from_ymd_opt(2024, 12, 20).unwrap_or_default();
        let options = vec![
            OptionContract {
                ticker: "PETRL385".into(),
                underlying: "PETR4".into(),
                kind: OptionKind::Call,
                strike: 38.50,
                expiry,
                last_price: 1.25,
                change: 15.4,
                volume: 1_250_000,
                open_interest: 4_500_000,
                iv: 32.5,
                greeks: Greeks { delta: 0.52, gamma: 0.12, theta: -0.04, vega: 0.08 },
                volume_avg_ratio: 4.8,
            },
            OptionContract {
                ticker: "PETRX360".into(),
                underlying: "PETR4".into(),
                kind: OptionKind::Put,
                strike: 36.00,
                expiry,
                last_price: 0.45,
                change: -22.1,
                volume: 850_000,
                open_interest: 2_100_000,
                iv: 35.2,
                greeks: Greeks { delta: -0.21, gamma: 0.08, theta: -0.03, vega: 0.05 },
                volume_avg_ratio: 3.2,
            },
            OptionContract {
                ticker: "VALEL640".into(),
                underlying: "VALE3".into(),
                kind: OptionKind::Call,
                strike: 64.00,
                expiry,
                last_price: 0.88,
                change: -45.2,
                volume: 3_200_000,
                open_interest: 8_500_000,
                iv: 28.4,
                greeks: Greeks { delta: 0.35, gamma: 0.10, theta: -0.02, vega: 0.07 },
                volume_avg_ratio: 1.1,
            },
            OptionContract {
                ticker: "VALEX600".into(),
                underlying: "VALE3".into(),
                kind: OptionKind::Put,
                strike: 60.00,
                expiry,
                last_price: 1.12,
                change: 55.4,
                volume: 4_100_000,
                open_interest: 6_200_000,
                iv: 30.1,
                greeks: Greeks { delta: -0.42, gamma: 0.11, theta: -0.03, vega: 0.06 },
                volume_avg_ratio: 6.5,
            },
            OptionContract {
                ticker: "MGLUL190".into(),
                underlying: "MGLU3".into(),
                kind: OptionKind::Call,
                strike: 1.90,
                expiry,
                last_price: 0.12,
                change: 45.0,
                volume: 15_200_000,
                open_interest: 45_000_000,
                iv: 85.2,
                greeks: Greeks { delta: 0.48, gamma: 1.25, theta: -0.01, vega: 0.02 },
                volume_avg_ratio: 12.5,
            },
        ];

        Self::new(tickers, options)
    }
}

#[allow(clippy::too_many_arguments)]
fn ticker(
    symbol: &str,
    price: f64,
    change: f64,
    change_percent: f64,
    high: f64,
    low: f64,
    volume: u64,
    options_volume: u64,
    (kairi, rsi7, stoch_k, stoch_d, signal): (f64, f64, f64, f64, Signal),
) -> TickerData {
    TickerData {
        symbol: symbol.to_string(),
        price,
        change,
        change_percent,
        high,
        low,
        volume,
        options_volume,
        technicals: TechnicalIndicators { kairi, rsi7, stoch_k, stoch_d, signal },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_shape() {
        let catalog = MarketCatalog::sample();
        assert_eq!(catalog.tickers().len(), 10);
        assert_eq!(catalog.options().len(), 5);
        for opt in catalog.options() {
            assert!(opt.strike > 0.0 && opt.iv > 0.0 && opt.last_price > 0.0);
            assert!(catalog.ticker(&opt.underlying).is_some(), "{} has no underlying", opt.ticker);
        }
    }

    #[test]
    fn test_lookups() {
        let catalog = MarketCatalog::sample();
        assert_eq!(catalog.ticker("PETR4").map(|t| t.price), Some(38.45));
        assert_eq!(catalog.option("PETRX360").map(|o| o.kind), Some(OptionKind::Put));
        assert!(catalog.ticker("XXXX3").is_none());
        assert!(catalog.option("NOPE").is_none());

        let petr: Vec<_> = catalog.options_for("PETR4").map(|o| o.ticker.as_str()).collect();
        assert_eq!(petr, ["PETRL385", "PETRX360"]);
        assert_eq!(catalog.options_for("ITUB4").count(), 0);
    }
}
