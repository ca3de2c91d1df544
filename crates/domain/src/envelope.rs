//! Uniform success/failure JSON bodies returned to every caller.
//!
//! Builders here are pure: the same inputs always yield the same map. The
//! envelope keys (`status`, `success`, `creator`) are written last so a
//! payload can never contradict the transport status.

use serde_json::{Map, Value};

use crate::error::ErrorKind;

pub const CREATOR: &str = "GiftedTech";

/// Success envelope: payload fields merged next to the envelope keys.
///
/// Object payloads are flattened into the envelope; any other JSON value is
/// nested under `data`.
pub fn success(status: u16, payload: Value) -> Map<String, Value> {
    success_with(status, Map::new(), payload)
}

/// Like [`success`], with call-specific echo fields placed before the
/// payload (payload fields override echoes, envelope keys override both).
pub fn success_with(status: u16, echoes: Map<String, Value>, payload: Value) -> Map<String, Value> {
    let mut body = echoes;
    match payload {
        Value::Object(fields) => body.extend(fields),
        Value::Null => {}
        other => {
            body.insert("data".to_string(), other);
        }
    }
    body.insert("status".to_string(), Value::from(status));
    body.insert("success".to_string(), Value::Bool(status < 400));
    body.insert("creator".to_string(), Value::from(CREATOR));
    body
}

pub fn failure(status: u16, message: impl Into<String>) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("status".to_string(), Value::from(status));
    body.insert("success".to_string(), Value::Bool(status < 400));
    body.insert("message".to_string(), Value::String(message.into()));
    body
}

/// Failure envelope for a classified error: status from the taxonomy mapping,
/// message from the error itself.
pub fn from_error(error: &ErrorKind) -> Map<String, Value> {
    failure(error.status_code(), error.to_string())
}
