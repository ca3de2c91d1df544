use std::{sync::Arc, time::Instant};

use movie_gateway_domain::{
    services::{rate_limit::RateLimiter, telemetry::TelemetryGuard},
    RuntimeMode,
};
use movie_gateway_upstream::MovieApi;

#[derive(Clone)]
pub struct AppState {
    movie_api: Arc<dyn MovieApi>,
    rate_limiter: RateLimiter,
    telemetry: TelemetryGuard,
    mode: RuntimeMode,
    started_at: Instant,
}

impl AppState {
    pub fn new(
        movie_api: Arc<dyn MovieApi>,
        rate_limiter: RateLimiter,
        telemetry: TelemetryGuard,
        mode: RuntimeMode,
    ) -> Self {
        Self {
            movie_api,
            rate_limiter,
            telemetry,
            mode,
            started_at: Instant::now(),
        }
    }

    pub fn movie_api(&self) -> &dyn MovieApi {
        self.movie_api.as_ref()
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn telemetry(&self) -> &TelemetryGuard {
        &self.telemetry
    }

    pub fn mode(&self) -> RuntimeMode {
        self.mode
    }

    pub fn uptime_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}
