//! Data structures exchanged between the handlers and the upstream client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::AsRefStr;

/// Query parameters for one upstream call. Only non-blank values are kept,
/// so an absent optional parameter never reaches the provider as `key=`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamQuery(Vec<(String, String)>);

impl UpstreamQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `key=value` when the value is present and non-blank.
    pub fn optional(mut self, key: &str, value: Option<&str>) -> Self {
        if let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) {
            self.0.push((key.to_string(), value.to_string()));
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }
}

/// A single GET against the provider. Built per call and never retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    endpoint: String,
    query: UpstreamQuery,
}

impl UpstreamRequest {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            query: UpstreamQuery::new(),
        }
    }

    /// `/{prefix}/{segment}` with the segment percent-encoded.
    pub fn with_segment(prefix: &str, segment: &str) -> Self {
        Self::new(format!(
            "/{}/{}",
            prefix.trim_matches('/'),
            urlencoding::encode(segment)
        ))
    }

    pub fn with_query(mut self, query: UpstreamQuery) -> Self {
        self.query = query;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn query(&self) -> &UpstreamQuery {
        &self.query
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

/// Outcome of the provider probe. Failures are captured here rather than
/// propagated, so producing a report never fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    pub fn healthy(api_status: u16) -> Self {
        Self {
            status: HealthState::Healthy,
            api_status: Some(api_status),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            status: HealthState::Unhealthy,
            api_status: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthState::Healthy
    }
}
