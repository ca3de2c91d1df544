//! Domain-level building blocks shared by the gateway's HTTP surface and its
//! upstream client: the failure taxonomy, response envelopes, configuration,
//! rate limiting and telemetry.

pub mod config;
pub mod envelope;
pub mod error;
pub mod model;
pub mod services;

pub use config::{ConfigError, GatewayConfig, RuntimeMode};
pub use error::ErrorKind;
pub use model::{HealthReport, HealthState, UpstreamQuery, UpstreamRequest};
pub use services::rate_limit::{Admission, RateLimitPolicy, RateLimiter};
