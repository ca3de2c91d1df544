//! Shared service helpers: per-client rate limiting and telemetry wiring.

pub mod rate_limit;
pub mod telemetry;

pub use rate_limit::*;
pub use telemetry::*;
