pub mod engine;
pub mod payoff;
pub mod session;
