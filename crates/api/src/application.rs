use std::sync::Arc;

use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    http::StatusCode,
    middleware::{from_fn, ErrorHandlers, Logger},
    web, App, HttpServer,
};
use movie_gateway_domain::{
    config::{ConfigError, GatewayConfig},
    services::{
        rate_limit::{RateLimitPolicy, RateLimiter},
        telemetry::{init_telemetry, TelemetryConfig, TelemetryError},
    },
};
use movie_gateway_upstream::{HttpMovieApi, UpstreamSetupError};
use thiserror::Error;
use tracing::info;

use crate::{
    handlers::{
        health_handler, homepage_handler, info_handler, metrics_handler, not_found_handler,
        query_config, rewrite_error_response, search_handler, sources_handler, trending_handler,
    },
    middleware::{admission_gate, panic_guard},
    state::AppState,
};

pub const API_PREFIX: &str = "/api/v2";

/// Seconds in-flight requests get to finish after a shutdown signal.
const SHUTDOWN_GRACE_SECS: u64 = 30;

pub async fn run() -> Result<(), BootstrapError> {
    // Config first: a gateway without upstream credentials must not bind.
    let config = GatewayConfig::load_from_env()?;
    let telemetry = init_telemetry(&TelemetryConfig::from_env("API"))?;

    let movie_api = HttpMovieApi::from_config(&config)?;
    let rate_limiter = RateLimiter::new(RateLimitPolicy::from_config(&config));
    let state = AppState::new(
        Arc::new(movie_api),
        rate_limiter,
        telemetry,
        config.mode(),
    );

    info!(
        host = config.host(),
        port = config.port(),
        prefix = API_PREFIX,
        environment = config.mode().as_str(),
        max_requests = config.rate_limit_max_requests(),
        window_secs = config.rate_limit_window().as_secs(),
        "movie gateway starting"
    );

    // actix installs SIGINT/SIGTERM handlers: on a signal it stops accepting,
    // lets in-flight requests drain, then resolves this future.
    HttpServer::new(move || build_app(state.clone()))
        .shutdown_timeout(SHUTDOWN_GRACE_SECS)
        .bind(config.bind_address())?
        .run()
        .await?;

    info!("movie gateway stopped");
    Ok(())
}

/// Full middleware stack and route table. Middleware order, outermost first:
/// access log, rate-limit admission, panic capture, error-body rewriting.
pub fn build_app(
    state: AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .wrap(error_envelopes())
        .wrap(from_fn(panic_guard))
        .wrap(from_fn(admission_gate))
        .wrap(Logger::default())
        .service(
            web::scope(API_PREFIX)
                .app_data(query_config())
                .route("/homepage", web::get().to(homepage_handler))
                .route("/trending", web::get().to(trending_handler))
                .route("/search/{query:[^/]*}", web::get().to(search_handler))
                .route("/info/{id:[^/]*}", web::get().to(info_handler))
                .route("/sources/{id:[^/]*}", web::get().to(sources_handler))
                .route("/health", web::get().to(health_handler)),
        )
        .route("/metrics", web::get().to(metrics_handler))
        .default_service(web::to(not_found_handler))
}

/// Rewrites framework-generated 405s and unrendered 500s into envelopes.
pub(crate) fn error_envelopes<B: 'static>() -> ErrorHandlers<B> {
    ErrorHandlers::new()
        .handler(StatusCode::METHOD_NOT_ALLOWED, rewrite_error_response)
        .handler(StatusCode::INTERNAL_SERVER_ERROR, rewrite_error_response)
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("upstream client error: {0}")]
    Upstream(#[from] UpstreamSetupError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
