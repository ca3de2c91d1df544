//! Failure vocabulary shared by the limiter, the upstream client and the
//! HTTP handlers.

use serde_json::Value;
use strum_macros::IntoStaticStr;
use thiserror::Error;

pub const UPSTREAM_FALLBACK_MESSAGE: &str = "API request failed";

/// Every failure that reaches a caller resolves to exactly one variant.
///
/// Upstream variants are produced once, by the upstream client, and are only
/// mapped to a status code afterwards.
#[derive(Debug, Clone, PartialEq, Error, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    #[error("{field} parameter {problem}")]
    ValidationError {
        field: &'static str,
        problem: &'static str,
    },
    #[error("Too many requests, please try again later.")]
    RateLimited,
    /// The request left the gateway but no response came back in time.
    #[error("No response from movie API - Service Unavailable")]
    UpstreamUnavailable { reason: String },
    /// The provider answered with a failure status.
    #[error("{message}")]
    UpstreamError {
        status: u16,
        message: String,
        raw_payload: Option<Value>,
    },
    /// The outbound request could not be built or sent.
    #[error("Error setting up request to movie API")]
    RequestSetupError { message: String },
    #[error("Endpoint not found. Please check the API documentation.")]
    NotFound,
}

impl ErrorKind {
    pub fn required(field: &'static str) -> Self {
        Self::ValidationError {
            field,
            problem: "is required",
        }
    }

    pub fn invalid(field: &'static str, problem: &'static str) -> Self {
        Self::ValidationError { field, problem }
    }

    /// Builds an upstream failure from the provider's status and body. The
    /// body's `message` field wins over the generic fallback.
    pub fn upstream(status: u16, raw_payload: Option<Value>) -> Self {
        let message = raw_payload
            .as_ref()
            .and_then(|body| body.get("message"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .unwrap_or(UPSTREAM_FALLBACK_MESSAGE)
            .to_string();

        Self::UpstreamError {
            status,
            message,
            raw_payload,
        }
    }

    /// HTTP status the failure envelope carries. Always in `400..=599`.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ValidationError { .. } => 400,
            Self::NotFound => 404,
            Self::RateLimited => 429,
            Self::UpstreamUnavailable { .. } => 503,
            Self::UpstreamError { status, .. } if (400..=599).contains(status) => *status,
            Self::UpstreamError { .. } => 502,
            Self::RequestSetupError { .. } => 500,
        }
    }

    /// Snake-case variant name used as a metric/log label.
    pub fn label(&self) -> &'static str {
        self.into()
    }

    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::UpstreamError { status, .. } => Some(*status),
            _ => None,
        }
    }
}
