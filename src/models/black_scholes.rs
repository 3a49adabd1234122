use crate::models::{PricingInputs, PricingModel};
use crate::state::OptionKind;
use std::f64::consts::PI;

/// Below this time to expiry (in years, ~53 minutes) an option is treated as expired.
pub const EXPIRY_EPSILON_YEARS: f64 = 0.0001;

// Zelen & Severo (A&S 26.2.17) coefficients. Absolute error < 7.5e-8.
const P: f64 = 0.2316419;
const A: [f64; 5] = [
    0.31938153,
    -0.356563782,
    1.781477937,
    -1.821255978,
    1.330274429,
];

/// Cumulative standard normal distribution, polynomial approximation.
///
/// Evaluated on |x| and reflected for negative arguments, so
/// `cnd(x) + cnd(-x) == 1` holds up to rounding.
#[inline]
pub fn cnd(x: f64) -> f64 {
    let l = x.abs();
    let k = 1.0 / (1.0 + P * l);
    let poly = k * (A[0] + k * (A[1] + k * (A[2] + k * (A[3] + k * A[4]))));
    let w = 1.0 - (-l * l / 2.0).exp() / (2.0 * PI).sqrt() * poly;
    if x < 0.0 {
        1.0 - w
    } else {
        w
    }
}

/// Payoff if exercised now (or at expiry with the underlying at `spot`).
#[inline]
pub fn intrinsic(spot: f64, strike: f64, kind: OptionKind) -> f64 {
    match kind {
        OptionKind::Call => (spot - strike).max(0.0),
        OptionKind::Put => (strike - spot).max(0.0),
    }
}

/// Black-Scholes European option price.
///
/// C = S*N(d1) - K*e^(-rT)*N(d2)
/// P = K*e^(-rT)*N(-d2) - S*N(-d1)
///
/// where d1 = (ln(S/K) + (r + sigma^2/2)*T) / (sigma*sqrt(T)), d2 = d1 - sigma*sqrt(T)
/// and sigma = volatility_pct / 100.
///
/// At or below `EXPIRY_EPSILON_YEARS` the intrinsic value is returned exactly.
/// `ttl_years` and `volatility_pct` must be non-negative; this is not checked.
pub fn price(
    spot: f64,
    strike: f64,
    ttl_years: f64,
    risk_free_rate: f64,
    volatility_pct: f64,
    kind: OptionKind,
) -> f64 {
    if ttl_years <= EXPIRY_EPSILON_YEARS {
        return intrinsic(spot, strike, kind);
    }

    let sigma = volatility_pct / 100.0;
    let sigma_sqrt_t = sigma * ttl_years.sqrt();
    let discounted_strike = strike * (-risk_free_rate * ttl_years).exp();

    // Zero volatility: the option is worth its discounted forward intrinsic value
    if sigma_sqrt_t < 1e-12 && sigma_sqrt_t >= 0.0 {
        return match kind {
            OptionKind::Call => (spot - discounted_strike).max(0.0),
            OptionKind::Put => (discounted_strike - spot).max(0.0),
        };
    }

    let d1 = ((spot / strike).ln() + (risk_free_rate + sigma * sigma / 2.0) * ttl_years) / sigma_sqrt_t;
    let d2 = d1 - sigma_sqrt_t;

    match kind {
        OptionKind::Call => spot * cnd(d1) - discounted_strike * cnd(d2),
        OptionKind::Put => discounted_strike * cnd(-d2) - spot * cnd(-d1),
    }
}

/// Black-Scholes pricer behind the `PricingModel` seam. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlackScholes;

impl PricingModel for BlackScholes {
    #[inline]
    fn name(&self) -> &'static str {
        "Black-Scholes"
    }

    #[inline]
    fn price(&self, inputs: &PricingInputs) -> f64 {
        price(
            inputs.spot,
            inputs.strike,
            inputs.ttl_years,
            inputs.risk_free_rate,
            inputs.volatility_pct,
            inputs.kind,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statrs::distribution::{ContinuousCDF, Normal};

    const R: f64 = 0.1075;

    #[test]
    fn test_cnd_matches_exact_normal() {
        let normal = Normal::new(0.0, 1.0).unwrap();
        let mut x = -6.0;
        while x <= 6.0 {
            let approx = cnd(x);
            let exact = normal.cdf(x);
            assert!(
                (approx - exact).abs() < 1e-7,
                "cnd({x}) = {approx}, exact = {exact}"
            );
            x += 0.05;
        }
    }

    #[test]
    fn test_cnd_symmetry() {
        for x in [0.0, 0.3, 1.0, 1.96, 3.5] {
            assert!((cnd(x) + cnd(-x) - 1.0).abs() < 1e-12, "symmetry broken at {x}");
        }
        assert!((cnd(0.0) - 0.5).abs() < 1e-7);
    }

    #[test]
    fn test_expired_returns_intrinsic_exactly() {
        let spot = 38.45;
        for strike in [36.0, 38.45, 40.0] {
            for t in [0.0, EXPIRY_EPSILON_YEARS] {
                assert_eq!(price(spot, strike, t, R, 32.5, OptionKind::Call), (spot - strike).max(0.0));
                assert_eq!(price(spot, strike, t, R, 32.5, OptionKind::Put), (strike - spot).max(0.0));
            }
        }
    }

    #[test]
    fn test_reference_values() {
        // Textbook: S=100, K=100, T=1, r=5%, sigma=20%
        let call = price(100.0, 100.0, 1.0, 0.05, 20.0, OptionKind::Call);
        let put = price(100.0, 100.0, 1.0, 0.05, 20.0, OptionKind::Put);
        assert!((call - 10.4506).abs() < 1e-3, "call={call}");
        assert!((put - 5.5735).abs() < 1e-3, "put={put}");
    }

    #[test]
    fn test_put_call_parity() {
        let spot = 38.45;
        for strike in [30.0, 36.0, 38.5, 45.0] {
            for t in [5.0 / 365.0, 20.0 / 365.0, 0.5, 2.0] {
                let call = price(spot, strike, t, R, 32.5, OptionKind::Call);
                let put = price(spot, strike, t, R, 32.5, OptionKind::Put);
                let parity = spot - strike * (-R * t).exp();
                assert!(
                    (call - put - parity).abs() < 1e-3,
                    "parity broken: K={strike} T={t} C-P={} S-Ke^-rT={parity}",
                    call - put
                );
            }
        }
    }

    #[test]
    fn test_monotone_in_volatility() {
        for kind in [OptionKind::Call, OptionKind::Put] {
            for strike in [30.0, 38.5, 48.0] {
                let mut prev = price(38.45, strike, 20.0 / 365.0, R, 1.0, kind);
                for vol in 2..=150 {
                    let p = price(38.45, strike, 20.0 / 365.0, R, vol as f64, kind);
                    assert!(p >= prev - 1e-6, "{kind:?} K={strike}: price fell at vol={vol}: {prev} -> {p}");
                    prev = p;
                }
            }
        }
    }

    #[test]
    fn test_non_negative_and_time_value() {
        let call = price(38.45, 38.5, 20.0 / 365.0, R, 32.5, OptionKind::Call);
        let put = price(38.45, 36.0, 20.0 / 365.0, R, 35.2, OptionKind::Put);
        assert!(call > 0.0 && call > intrinsic(38.45, 38.5, OptionKind::Call));
        assert!(put > 0.0 && put < 36.0);
    }

    #[test]
    fn test_zero_volatility_is_discounted_intrinsic() {
        let t = 0.5;
        let call = price(40.0, 38.0, t, R, 0.0, OptionKind::Call);
        assert!((call - (40.0 - 38.0 * (-R * t).exp())).abs() < 1e-12);
        assert_eq!(price(30.0, 38.0, t, R, 0.0, OptionKind::Call), 0.0);
    }

    #[test]
    fn test_trait_delegates() {
        let model = BlackScholes;
        let inputs = PricingInputs {
            spot: 62.12,
            strike: 64.0,
            ttl_years: 20.0 / 365.0,
            risk_free_rate: R,
            volatility_pct: 28.4,
            kind: OptionKind::Call,
        };
        assert_eq!(model.name(), "Black-Scholes");
        assert_eq!(model.price(&inputs), price(62.12, 64.0, 20.0 / 365.0, R, 28.4, OptionKind::Call));
    }
}
