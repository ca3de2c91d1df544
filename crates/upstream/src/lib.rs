//! Client for the movie metadata provider. Every call carries the bearer
//! credential and a hard timeout, and every failure leaves this crate already
//! classified into the shared `ErrorKind` taxonomy.

pub mod client;

pub use client::{HttpMovieApi, MovieApi, UpstreamSetupError, HEALTH_PROBE_ENDPOINT};
