use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use movie_gateway_domain::{
    config::GatewayConfig,
    model::{HealthReport, UpstreamRequest},
    ErrorKind,
};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Url,
};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Endpoint probed by [`MovieApi::health_check`].
pub const HEALTH_PROBE_ENDPOINT: &str = "/homepage";

const USER_AGENT: &str = concat!("movie-gateway/", env!("CARGO_PKG_VERSION"));

/// Read-only access to the movie metadata provider.
///
/// Handlers only see this trait so tests can swap in a fake transport.
#[async_trait]
pub trait MovieApi: Send + Sync {
    /// Issues `GET endpoint?query` and returns the decoded JSON body. Every
    /// failure is classified exactly once into an [`ErrorKind`].
    async fn get(&self, request: &UpstreamRequest) -> Result<Value, ErrorKind>;

    /// Probes the provider. Never fails; problems land in the report.
    async fn health_check(&self) -> HealthReport;
}

/// reqwest-backed provider client with the credential baked into its default
/// headers.
#[derive(Debug, Clone)]
pub struct HttpMovieApi {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
    health_timeout: Duration,
}

impl HttpMovieApi {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
    pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

    /// Validates the base URL and credential up front; a client that cannot
    /// authenticate is never handed out.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, UpstreamSetupError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(UpstreamSetupError::MissingBaseUrl);
        }
        let parsed = Url::parse(base_url).map_err(|err| UpstreamSetupError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: err.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(UpstreamSetupError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme `{}`", parsed.scheme()),
            });
        }

        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(UpstreamSetupError::MissingApiKey);
        }
        let mut bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| UpstreamSetupError::InvalidApiKey)?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .build()
            .map_err(UpstreamSetupError::Client)?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            request_timeout: Self::REQUEST_TIMEOUT,
            health_timeout: Self::HEALTH_TIMEOUT,
        })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, UpstreamSetupError> {
        Self::new(config.movie_api_base_url(), config.movie_api_key())
    }

    pub fn with_timeouts(mut self, request_timeout: Duration, health_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self.health_timeout = health_timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, endpoint: &str) -> Result<Url, ErrorKind> {
        let joined = if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        };
        Url::parse(&joined).map_err(|err| ErrorKind::RequestSetupError {
            message: format!("invalid upstream url `{joined}`: {err}"),
        })
    }

    async fn execute(&self, request: &UpstreamRequest) -> Result<Value, ErrorKind> {
        let url = self.url_for(request.endpoint())?;
        let response = self
            .http
            .get(url)
            .query(request.query().pairs())
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let payload = response
                .bytes()
                .await
                .ok()
                .and_then(|body| serde_json::from_slice::<Value>(&body).ok());
            return Err(ErrorKind::upstream(status.as_u16(), payload));
        }

        let body = response.bytes().await.map_err(classify_transport_error)?;
        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&body).map_err(|err| ErrorKind::UpstreamError {
            status: 502,
            message: "Movie API returned a malformed payload".to_string(),
            raw_payload: Some(Value::String(err.to_string())),
        })
    }
}

#[async_trait]
impl MovieApi for HttpMovieApi {
    async fn get(&self, request: &UpstreamRequest) -> Result<Value, ErrorKind> {
        let endpoint = endpoint_label(request.endpoint());
        let started = Instant::now();
        let result = self.execute(request).await;
        histogram!("upstream_request_duration_seconds", "endpoint" => endpoint.clone())
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(_) => {
                counter!("upstream_requests_total", "endpoint" => endpoint, "result" => "ok")
                    .increment(1);
                debug!(path = request.endpoint(), "movie api request succeeded");
            }
            Err(err) => {
                counter!(
                    "upstream_requests_total",
                    "endpoint" => endpoint,
                    "result" => err.label()
                )
                .increment(1);
                log_failure(request, err);
            }
        }
        result
    }

    async fn health_check(&self) -> HealthReport {
        let url = match self.url_for(HEALTH_PROBE_ENDPOINT) {
            Ok(url) => url,
            Err(err) => return HealthReport::unhealthy(err.to_string()),
        };

        match self
            .http
            .get(url)
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                HealthReport::healthy(response.status().as_u16())
            }
            Ok(response) => {
                let status = response.status().as_u16();
                warn!(
                    method = "GET",
                    path = HEALTH_PROBE_ENDPOINT,
                    upstream_status = status,
                    "movie api health probe failed"
                );
                HealthReport::unhealthy(format!("Request failed with status code {status}"))
            }
            Err(err) => {
                warn!(
                    method = "GET",
                    path = HEALTH_PROBE_ENDPOINT,
                    timeout = err.is_timeout(),
                    error = %err,
                    "movie api health probe failed"
                );
                HealthReport::unhealthy(err.to_string())
            }
        }
    }
}

/// Maps a reqwest failure that happened before any response was read.
/// Builder errors mean the request never left; everything else (timeouts,
/// refused connections, broken bodies) means the provider did not answer.
fn classify_transport_error(err: reqwest::Error) -> ErrorKind {
    if err.is_builder() {
        ErrorKind::RequestSetupError {
            message: err.to_string(),
        }
    } else {
        ErrorKind::UpstreamUnavailable {
            reason: err.to_string(),
        }
    }
}

fn log_failure(request: &UpstreamRequest, err: &ErrorKind) {
    let detail = match err {
        ErrorKind::UpstreamUnavailable { reason } => Some(reason.as_str()),
        ErrorKind::RequestSetupError { message } => Some(message.as_str()),
        _ => None,
    };
    warn!(
        method = "GET",
        path = request.endpoint(),
        upstream_status = err.upstream_status(),
        kind = err.label(),
        detail,
        error = %err,
        "movie api request failed"
    );
}

/// First path segment, e.g. `/search/matrix` -> `search`.
fn endpoint_label(endpoint: &str) -> String {
    endpoint
        .trim_start_matches('/')
        .split('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or("root")
        .to_string()
}

/// Startup failures: the gateway refuses to boot without a usable client.
#[derive(Debug, Error)]
pub enum UpstreamSetupError {
    #[error("movie API base url is not configured")]
    MissingBaseUrl,
    #[error("movie API key is not configured")]
    MissingApiKey,
    #[error("movie API base url `{url}` is invalid: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("movie API key contains characters not allowed in a header")]
    InvalidApiKey,
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}
