use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use movie_gateway_domain::{envelope, model::HealthReport};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{application::API_PREFIX, state::AppState};

use super::ApiError;

const SERVICE_MESSAGE: &str = "Movie Gateway API";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthPayload {
    message: &'static str,
    backend: BackendStatus,
    movie_api: HealthReport,
    endpoints: Endpoints,
}

#[derive(Debug, Serialize)]
struct BackendStatus {
    status: &'static str,
    uptime: f64,
    timestamp: DateTime<Utc>,
    version: &'static str,
    environment: &'static str,
}

#[derive(Debug, Serialize)]
struct Endpoints {
    homepage: String,
    trending: String,
    search: String,
    info: String,
    sources: String,
}

impl Endpoints {
    fn under(prefix: &str) -> Self {
        Self {
            homepage: format!("{prefix}/homepage"),
            trending: format!("{prefix}/trending"),
            search: format!("{prefix}/search/{{query}}"),
            info: format!("{prefix}/info/{{id}}"),
            sources: format!("{prefix}/sources/{{id}}"),
        }
    }
}

/// Always 200 while the report can be built; provider trouble shows up in
/// `movieApi.status`, not in the transport status.
pub async fn health_handler(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let report = state.movie_api().health_check().await;
    let body = health_body(&state, report)
        .map_err(|err| ApiError::internal("Health check failed", err, state.mode()))?;
    Ok(HttpResponse::Ok().json(body))
}

fn health_body(
    state: &AppState,
    report: HealthReport,
) -> Result<Map<String, Value>, serde_json::Error> {
    let payload = HealthPayload {
        message: SERVICE_MESSAGE,
        backend: BackendStatus {
            status: "running",
            uptime: state.uptime_secs(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION"),
            environment: state.mode().as_str(),
        },
        movie_api: report,
        endpoints: Endpoints::under(API_PREFIX),
    };
    Ok(envelope::success(200, serde_json::to_value(payload)?))
}
