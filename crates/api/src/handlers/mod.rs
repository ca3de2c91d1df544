pub mod catalog;
pub mod fallback;
pub mod health;
pub mod metrics;
pub mod search;
pub mod title;

pub use catalog::{homepage_handler, trending_handler};
pub use fallback::{not_found_handler, rewrite_error_response};
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use search::search_handler;
pub use title::{info_handler, sources_handler};

use std::fmt::Display;

use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, ResponseError};
use ::metrics::counter;
use movie_gateway_domain::{envelope, model::UpstreamRequest, ErrorKind, RuntimeMode};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::state::AppState;

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Kind(#[from] ErrorKind),
    /// A fault nobody classified. `detail` only reaches the caller in
    /// development mode.
    #[error("{message}: {detail}")]
    Internal {
        message: &'static str,
        detail: String,
        expose: bool,
    },
}

impl ApiError {
    pub fn internal(message: &'static str, detail: impl Display, mode: RuntimeMode) -> Self {
        Self::Internal {
            message,
            detail: detail.to_string(),
            expose: mode.is_development(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Kind(kind) => StatusCode::from_u16(kind.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = match self {
            ApiError::Kind(kind) => envelope::failure(status.as_u16(), kind.to_string()),
            ApiError::Internal {
                message,
                detail,
                expose,
            } => {
                if *expose {
                    let mut body = envelope::failure(status.as_u16(), detail.clone());
                    body.insert("context".to_string(), Value::from(*message));
                    body
                } else {
                    envelope::failure(status.as_u16(), *message)
                }
            }
        };
        HttpResponse::build(status).json(body)
    }
}

/// Routes malformed query strings into the validation taxonomy instead of
/// actix's plain-text 400.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req: &HttpRequest| {
        tracing::debug!(error = %err, "rejecting malformed query string");
        ApiError::from(ErrorKind::invalid("query", "is malformed")).into()
    })
}

/// Trims a required path segment, failing validation when nothing is left.
pub(crate) fn required_segment(
    endpoint: &'static str,
    field: &'static str,
    raw: &str,
) -> Result<String, ApiError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(rejected(endpoint, ErrorKind::required(field)));
    }
    Ok(value.to_string())
}

/// Records a request refused before any upstream call was made.
pub(crate) fn rejected(endpoint: &'static str, kind: ErrorKind) -> ApiError {
    counter!("api_responses_total", "endpoint" => endpoint, "outcome" => kind.label())
        .increment(1);
    kind.into()
}

/// Calls the provider and wraps the outcome. `echoes` are call-specific
/// fields placed next to the payload in the success envelope.
pub(crate) async fn forward(
    state: &AppState,
    endpoint: &'static str,
    request: UpstreamRequest,
    echoes: Map<String, Value>,
) -> Result<HttpResponse, ApiError> {
    match state.movie_api().get(&request).await {
        Ok(payload) => {
            counter!("api_responses_total", "endpoint" => endpoint, "outcome" => "ok")
                .increment(1);
            Ok(HttpResponse::Ok().json(envelope::success_with(200, echoes, payload)))
        }
        Err(kind) => {
            counter!("api_responses_total", "endpoint" => endpoint, "outcome" => kind.label())
                .increment(1);
            Err(kind.into())
        }
    }
}
