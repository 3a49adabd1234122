use crate::errors::{EngineError, EngineResult};
use crate::market::catalog::MarketData;
use crate::state::{LegList, PayoffProfile, Side, StrategyLeg, StrategySnapshot};
use crate::strategy::payoff;
use std::sync::Arc;

/// One strategy-builder session: the selected underlying, the horizon, and the legs.
///
/// Owns the leg collection outright. Legs only change through `add_leg`, `remove_leg`,
/// `set_simulated_iv` and `clear`, and every input is validated before the set changes,
/// so the payoff simulator can trust what it receives.
pub struct StrategySession {
    market: Arc<dyn MarketData>,
    underlying: String,
    spot: f64,
    days_to_expiry: u32,
    risk_free_rate: f64,
    default_quantity: u32,
    legs: LegList,
}

impl StrategySession {
    pub fn new(
        market: Arc<dyn MarketData>,
        underlying: &str,
        days_to_expiry: u32,
        risk_free_rate: f64,
        default_quantity: u32,
    ) -> EngineResult<Self> {
        if default_quantity == 0 {
            return Err(EngineError::Validation("default quantity must be positive".into()));
        }
        let spot = lookup_spot(market.as_ref(), underlying)?;
        Ok(Self {
            market,
            underlying: underlying.to_string(),
            spot,
            days_to_expiry,
            risk_free_rate,
            default_quantity,
            legs: LegList::new(),
        })
    }

    #[inline]
    pub fn legs(&self) -> &[StrategyLeg] {
        &self.legs
    }

    #[inline]
    pub fn spot(&self) -> f64 {
        self.spot
    }

    #[inline]
    pub fn underlying(&self) -> &str {
        &self.underlying
    }

    #[inline]
    pub fn days_to_expiry(&self) -> u32 {
        self.days_to_expiry
    }

    /// Switch the underlying whose spot anchors the sampled band. Legs are kept.
    pub fn select_underlying(&mut self, symbol: &str) -> EngineResult<()> {
        let spot = lookup_spot(self.market.as_ref(), symbol)?;
        self.underlying = symbol.to_string();
        self.spot = spot;
        Ok(())
    }

    pub fn set_days_to_expiry(&mut self, days: u32) {
        self.days_to_expiry = days;
    }

    /// Add a position in `option_ticker`. Returns the new leg id.
    ///
    /// The contract must exist and belong to the selected underlying. Quantity defaults
    /// to the configured lot; the simulated IV starts at the contract's own IV.
    pub fn add_leg(&mut self, option_ticker: &str, side: Side, quantity: Option<u32>) -> EngineResult<String> {
        let option = self
            .market
            .option(option_ticker)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("option {option_ticker}")))?;

        if option.underlying != self.underlying {
            return Err(EngineError::Validation(format!(
                "option {option_ticker} is written on {}, not {}",
                option.underlying, self.underlying
            )));
        }

        let quantity = quantity.unwrap_or(self.default_quantity);
        if quantity == 0 {
            return Err(EngineError::Validation("quantity must be positive".into()));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let simulated_iv = Some(option.iv);
        tracing::info!(
            id = %id,
            option = %option.ticker,
            side = %side,
            quantity,
            "leg added"
        );

        self.legs.push(StrategyLeg {
            id: id.clone(),
            option,
            side,
            quantity,
            simulated_iv,
        });
        Ok(id)
    }

    pub fn remove_leg(&mut self, id: &str) -> EngineResult<StrategyLeg> {
        let idx = self
            .legs
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| EngineError::NotFound(format!("leg {id}")))?;
        let leg = self.legs.remove(idx);
        tracing::info!(id = %id, option = %leg.option.ticker, "leg removed");
        Ok(leg)
    }

    /// Override (or with None, reset) the volatility a leg is repriced with.
    pub fn set_simulated_iv(&mut self, id: &str, iv: Option<f64>) -> EngineResult<()> {
        if let Some(v) = iv {
            if !v.is_finite() || v < 0.0 {
                return Err(EngineError::Validation(format!("invalid implied volatility: {v}")));
            }
        }
        let leg = self
            .legs
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| EngineError::NotFound(format!("leg {id}")))?;
        leg.simulated_iv = iv;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.legs.clear();
    }

    /// Resample the payoff curve for the current state.
    pub fn profile(&self) -> PayoffProfile {
        payoff::simulate(&self.legs, self.spot, self.days_to_expiry, self.risk_free_rate)
    }

    pub fn snapshot(&self) -> StrategySnapshot {
        StrategySnapshot {
            underlying: self.underlying.clone(),
            spot: self.spot,
            days_to_expiry: self.days_to_expiry,
            risk_free_rate: self.risk_free_rate,
            legs: self.legs.to_vec(),
            profile: self.profile(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

fn lookup_spot(market: &dyn MarketData, symbol: &str) -> EngineResult<f64> {
    let ticker = market
        .ticker(symbol)
        .ok_or_else(|| EngineError::NotFound(format!("underlying {symbol}")))?;
    if ticker.price <= 0.0 || !ticker.price.is_finite() {
        return Err(EngineError::Validation(format!("invalid spot for {symbol}: {}", ticker.price)));
    }
    Ok(ticker.price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::catalog::MarketCatalog;

    fn session() -> StrategySession {
        StrategySession::new(Arc::new(MarketCatalog::sample()), "PETR4", 20, 0.1075, 100).unwrap()
    }

    #[test]
    fn test_new_rejects_unknown_underlying() {
        let res = StrategySession::new(Arc::new(MarketCatalog::sample()), "XXXX3", 20, 0.1075, 100);
        assert!(matches!(res, Err(EngineError::NotFound(_))));
    }

    #[test]
    fn test_add_leg_defaults() {
        let mut s = session();
        let id = s.add_leg("PETRL385", Side::Buy, None).unwrap();
        assert_eq!(s.legs().len(), 1);
        let leg = &s.legs()[0];
        assert_eq!(leg.id, id);
        assert_eq!(leg.quantity, 100);
        assert_eq!(leg.simulated_iv, Some(32.5));
        assert_eq!(leg.side, Side::Buy);
    }

    #[test]
    fn test_add_leg_validation() {
        let mut s = session();
        assert!(matches!(s.add_leg("NOPE", Side::Buy, None), Err(EngineError::NotFound(_))));
        assert!(matches!(s.add_leg("VALEL640", Side::Buy, None), Err(EngineError::Validation(_))));
        assert!(matches!(s.add_leg("PETRL385", Side::Sell, Some(0)), Err(EngineError::Validation(_))));
        assert!(s.legs().is_empty(), "rejected legs must not be stored");
    }

    #[test]
    fn test_remove_leg() {
        let mut s = session();
        let a = s.add_leg("PETRL385", Side::Buy, None).unwrap();
        let b = s.add_leg("PETRX360", Side::Buy, Some(200)).unwrap();
        let removed = s.remove_leg(&a).unwrap();
        assert_eq!(removed.option.ticker, "PETRL385");
        assert_eq!(s.legs().len(), 1);
        assert_eq!(s.legs()[0].id, b);
        assert!(matches!(s.remove_leg(&a), Err(EngineError::NotFound(_))));
    }

    #[test]
    fn test_profile_tracks_mutations() {
        let mut s = session();
        assert!(s.profile().samples.is_empty());

        s.add_leg("PETRL385", Side::Buy, None).unwrap();
        s.add_leg("PETRX360", Side::Buy, None).unwrap();
        let p = s.profile();
        assert_eq!(p.samples.len(), 21);
        assert!((p.risk.max_risk - 170.0).abs() < 1e-9);
        assert!(!p.risk.unlimited_risk);

        let id = s.add_leg("PETRL385", Side::Sell, Some(200)).unwrap();
        assert!(s.profile().risk.unlimited_risk);
        s.remove_leg(&id).unwrap();
        assert!(!s.profile().risk.unlimited_risk);

        s.clear();
        assert_eq!(s.profile().risk.max_risk, 0.0);
    }

    #[test]
    fn test_horizon_changes_theoretical_only() {
        let mut s = session();
        s.add_leg("PETRL385", Side::Buy, None).unwrap();
        let near = s.profile();
        s.set_days_to_expiry(60);
        let far = s.profile();
        assert_eq!(s.days_to_expiry(), 60);
        for (a, b) in near.samples.iter().zip(far.samples.iter()) {
            assert_eq!(a.profit, b.profit);
        }
        assert!(far.samples[10].theoretical > near.samples[10].theoretical);
    }

    #[test]
    fn test_simulated_iv() {
        let mut s = session();
        let id = s.add_leg("PETRL385", Side::Buy, None).unwrap();
        s.set_simulated_iv(&id, Some(50.0)).unwrap();
        assert_eq!(s.legs()[0].effective_iv(), 50.0);
        s.set_simulated_iv(&id, None).unwrap();
        assert_eq!(s.legs()[0].effective_iv(), 32.5);
        assert!(matches!(s.set_simulated_iv(&id, Some(-1.0)), Err(EngineError::Validation(_))));
        assert!(matches!(s.set_simulated_iv(&id, Some(f64::NAN)), Err(EngineError::Validation(_))));
        assert!(matches!(s.set_simulated_iv("missing", Some(30.0)), Err(EngineError::NotFound(_))));
    }

    #[test]
    fn test_select_underlying_moves_band() {
        let mut s = session();
        s.select_underlying("VALE3").unwrap();
        assert_eq!(s.spot(), 62.12);
        assert_eq!(s.underlying(), "VALE3");
        s.add_leg("VALEX600", Side::Sell, Some(100)).unwrap();
        let p = s.profile();
        assert!((p.samples[0].price - 43.48).abs() < 0.01);
        assert!(s.select_underlying("XXXX3").is_err());
        assert_eq!(s.underlying(), "VALE3");
    }
}
