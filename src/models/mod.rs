pub mod black_scholes;

use crate::state::OptionKind;

/// All pricing models implement this trait.
/// price() must be a pure function: deterministic output from inputs only.
/// Send + Sync required for use across tokio tasks.
pub trait PricingModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Theoretical value of a European option. Non-negative for valid inputs.
    fn price(&self, inputs: &PricingInputs) -> f64;
}

/// Inputs for one valuation. Stack-allocated, Copy.
///
/// `volatility_pct` is annualized and expressed in percent (32.5 = 32.5%).
/// `ttl_years` and `volatility_pct` must be non-negative; negative values are a
/// precondition violation and yield NaN.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct PricingInputs {
    pub spot: f64,
    pub strike: f64,
    pub ttl_years: f64,
    pub risk_free_rate: f64,
    pub volatility_pct: f64,
    pub kind: OptionKind,
}
