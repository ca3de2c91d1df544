use actix_web::{web, HttpResponse};
use movie_gateway_domain::{
    model::{UpstreamQuery, UpstreamRequest},
    ErrorKind,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::state::AppState;

use super::{forward, rejected, required_segment, ApiError};

const DEFAULT_PAGE: u32 = 1;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SearchParams {
    pub page: Option<String>,
}

pub async fn search_handler(
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<SearchParams>,
) -> Result<HttpResponse, ApiError> {
    let query = required_segment("search", "query", &path)?;
    let page = parse_page(params.page.as_deref())?;

    let request = UpstreamRequest::with_segment("search", &query).with_query(
        UpstreamQuery::new().optional("page", Some(page.to_string().as_str())),
    );

    let mut echoes = Map::new();
    echoes.insert("query".to_string(), Value::String(query));
    echoes.insert("page".to_string(), Value::from(page));

    forward(&state, "search", request, echoes).await
}

/// Blank means the first page; anything else must be a positive integer.
fn parse_page(raw: Option<&str>) -> Result<u32, ApiError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(DEFAULT_PAGE),
        Some(value) => value
            .parse::<u32>()
            .ok()
            .filter(|page| *page > 0)
            .ok_or_else(|| {
                rejected(
                    "search",
                    ErrorKind::invalid("page", "must be a positive integer"),
                )
            }),
    }
}
