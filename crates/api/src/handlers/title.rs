use actix_web::{web, HttpResponse};
use movie_gateway_domain::model::{UpstreamQuery, UpstreamRequest};
use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::state::AppState;

use super::{forward, required_segment, ApiError};

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SourcesParams {
    pub season: Option<String>,
    pub episode: Option<String>,
}

pub async fn info_handler(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = required_segment("info", "id", &path)?;
    forward(
        &state,
        "info",
        UpstreamRequest::with_segment("info", &id),
        Map::new(),
    )
    .await
}

/// Playback sources; `season`/`episode` are forwarded only when non-blank.
pub async fn sources_handler(
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<SourcesParams>,
) -> Result<HttpResponse, ApiError> {
    let id = required_segment("sources", "id", &path)?;
    let SourcesParams { season, episode } = params.into_inner();
    let request = UpstreamRequest::with_segment("sources", &id).with_query(
        UpstreamQuery::new()
            .optional("season", season.as_deref())
            .optional("episode", episode.as_deref()),
    );
    forward(&state, "sources", request, Map::new()).await
}
