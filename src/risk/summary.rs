use crate::state::{OptionKind, PayoffSample, RiskSummary, Side, StrategyLeg};

/// Net call contracts held: BUY adds, SELL subtracts.
/// Negative means the strategy is a net seller of calls.
#[inline]
pub fn net_call_exposure(legs: &[StrategyLeg]) -> i64 {
    legs.iter()
        .filter(|l| l.option.kind == OptionKind::Call)
        .map(|l| match l.side {
            Side::Buy => l.quantity as i64,
            Side::Sell => -(l.quantity as i64),
        })
        .sum()
}

impl RiskSummary {
    /// No position, no risk.
    pub const fn none() -> Self {
        Self {
            max_risk: 0.0,
            unlimited_risk: false,
        }
    }

    /// Derive risk from a sampled curve and the leg set that produced it.
    ///
    /// max_risk is the sampled minimum only; a trough falling between two sample
    /// points is not captured. unlimited_risk is structural and ignores the curve.
    pub fn from_samples(samples: &[PayoffSample], legs: &[StrategyLeg]) -> Self {
        let lowest = samples
            .iter()
            .map(|s| s.profit)
            .fold(f64::INFINITY, f64::min);

        Self {
            max_risk: if lowest < 0.0 { lowest.abs() } else { 0.0 },
            unlimited_risk: net_call_exposure(legs) < 0,
        }
    }

    /// Label and value as the dashboard risk card shows them.
    pub fn headline(&self) -> (&'static str, String) {
        if self.unlimited_risk {
            ("Risco Ilimitado", "∞".to_string())
        } else {
            ("Perda Máxima", format!("R$ {:.2}", self.max_risk))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Greeks, OptionContract};
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn leg(kind: OptionKind, side: Side, quantity: u32) -> StrategyLeg {
        StrategyLeg {
            id: format!("{kind}-{side}-{quantity}"),
            option: Arc::new(OptionContract {
                ticker: "TEST".into(),
                underlying: "PETR4".into(),
                kind,
                strike: 38.5,
                expiry: NaiveDate::from_ymd_opt(2024, 12, 20).unwrap(),
                last_price: 1.0,
                change: 0.0,
                volume: 0,
                open_interest: 0,
                iv: 30.0,
                greeks: Greeks { delta: 0.0, gamma: 0.0, theta: 0.0, vega: 0.0 },
                volume_avg_ratio: 1.0,
            }),
            side,
            quantity,
            simulated_iv: None,
        }
    }

    fn sample(profit: f64) -> PayoffSample {
        PayoffSample { price: 0.0, profit, theoretical: profit }
    }

    #[test]
    fn test_net_call_exposure_ignores_puts() {
        let legs = [
            leg(OptionKind::Call, Side::Buy, 100),
            leg(OptionKind::Call, Side::Sell, 300),
            leg(OptionKind::Put, Side::Sell, 1000),
        ];
        assert_eq!(net_call_exposure(&legs), -200);
    }

    #[test]
    fn test_covered_calls_are_bounded() {
        let legs = [leg(OptionKind::Call, Side::Buy, 100), leg(OptionKind::Call, Side::Sell, 100)];
        let risk = RiskSummary::from_samples(&[sample(-5.0), sample(10.0)], &legs);
        assert!(!risk.unlimited_risk);
        assert_eq!(risk.max_risk, 5.0);
    }

    #[test]
    fn test_positive_floor_reports_zero() {
        let legs = [leg(OptionKind::Put, Side::Sell, 100)];
        let risk = RiskSummary::from_samples(&[sample(0.0), sample(3.5)], &legs);
        assert_eq!(risk.max_risk, 0.0);
        assert!(!risk.unlimited_risk, "short puts are not flagged unlimited");
    }

    #[test]
    fn test_headline() {
        assert_eq!(RiskSummary { max_risk: 170.0, unlimited_risk: false }.headline().1, "R$ 170.00");
        let (label, value) = RiskSummary { max_risk: 1.0, unlimited_risk: true }.headline();
        assert_eq!(label, "Risco Ilimitado");
        assert_eq!(value, "∞");
        assert_eq!(RiskSummary::none().max_risk, 0.0);
    }
}
