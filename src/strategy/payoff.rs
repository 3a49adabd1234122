use crate::models::black_scholes::{intrinsic, BlackScholes};
use crate::models::{PricingInputs, PricingModel};
use crate::state::{PayoffProfile, PayoffSample, RiskSummary, StrategyLeg};

/// Points on the curve, endpoints included (20 intervals).
pub const SAMPLE_POINTS: usize = 21;

/// Half-width of the sampled band around spot, as a fraction of spot.
pub const BAND_WIDTH: f64 = 0.30;

pub const DAYS_PER_YEAR: f64 = 365.0;

/// Underlying prices the curve is sampled at: [max(0, 0.7*S), 1.3*S], evenly spaced.
///
/// Each point is min + i*step, so the upper endpoint is always present.
pub fn price_grid(spot_now: f64) -> [f64; SAMPLE_POINTS] {
    let range = spot_now * BAND_WIDTH;
    let min = (spot_now - range).max(0.0);
    let max = spot_now + range;
    let step = (max - min) / (SAMPLE_POINTS - 1) as f64;

    let mut grid = [0.0; SAMPLE_POINTS];
    for (i, p) in grid.iter_mut().enumerate() {
        *p = min + i as f64 * step;
    }
    grid[SAMPLE_POINTS - 1] = max;
    grid
}

/// Sample the strategy's profit/loss across the band with the Black-Scholes pricer.
pub fn simulate(
    legs: &[StrategyLeg],
    spot_now: f64,
    days_to_expiry: u32,
    risk_free_rate: f64,
) -> PayoffProfile {
    simulate_with(&BlackScholes, legs, spot_now, days_to_expiry, risk_free_rate)
}

/// Sample the strategy's profit/loss across the band.
///
/// For every grid price, each leg contributes (value - entry) * quantity, sign-flipped
/// for SELL, once with the intrinsic value (at expiration) and once with the model value
/// at `days_to_expiry`. All legs share that single horizon.
///
/// Pure function of its inputs. Callers validate legs and spot beforehand.
pub fn simulate_with(
    model: &dyn PricingModel,
    legs: &[StrategyLeg],
    spot_now: f64,
    days_to_expiry: u32,
    risk_free_rate: f64,
) -> PayoffProfile {
    if legs.is_empty() {
        return PayoffProfile {
            samples: Vec::new(),
            risk: RiskSummary::none(),
        };
    }

    let ttl_years = days_to_expiry as f64 / DAYS_PER_YEAR;
    let mut samples = Vec::with_capacity(SAMPLE_POINTS);

    for price in price_grid(spot_now) {
        let mut at_expiry = 0.0;
        let mut theoretical = 0.0;

        for leg in legs {
            let contract = &leg.option;
            let exp_value = intrinsic(price, contract.strike, contract.kind);
            let theo_value = model.price(&PricingInputs {
                spot: price,
                strike: contract.strike,
                ttl_years,
                risk_free_rate,
                volatility_pct: leg.effective_iv(),
                kind: contract.kind,
            });

            let cost = leg.entry_price();
            let qty = leg.quantity as f64;
            let sign = leg.side.sign();
            at_expiry += sign * (exp_value - cost) * qty;
            theoretical += sign * (theo_value - cost) * qty;
        }

        samples.push(PayoffSample {
            price: round_cents(price),
            profit: round_cents(at_expiry),
            theoretical: round_cents(theoretical),
        });
    }

    let risk = RiskSummary::from_samples(&samples, legs);

    tracing::debug!(
        model = model.name(),
        legs = legs.len(),
        spot = spot_now,
        days = days_to_expiry,
        max_risk = risk.max_risk,
        unlimited = risk.unlimited_risk,
        "payoff resampled"
    );

    PayoffProfile { samples, risk }
}

#[inline]
fn round_cents(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
