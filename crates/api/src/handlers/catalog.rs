use actix_web::{web, HttpResponse};
use movie_gateway_domain::model::UpstreamRequest;
use serde_json::Map;

use crate::state::AppState;

use super::{forward, ApiError};

pub async fn homepage_handler(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    forward(&state, "homepage", UpstreamRequest::new("/homepage"), Map::new()).await
}

pub async fn trending_handler(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    forward(&state, "trending", UpstreamRequest::new("/trending"), Map::new()).await
}
