use std::{any::Any, panic::AssertUnwindSafe};

use actix_web::{
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::{HeaderValue, RETRY_AFTER},
    middleware::Next,
    web, Error, ResponseError,
};
use futures::FutureExt;
use movie_gateway_domain::{Admission, ErrorKind, RuntimeMode};
use tracing::{debug, error, warn};

use crate::{
    handlers::{ApiError, INTERNAL_ERROR_MESSAGE},
    state::AppState,
};

const UNKNOWN_CLIENT: &str = "unknown";

/// First stage of every request: charge the caller's quota.
/// A rejected caller never reaches routing, validation or the provider.
pub async fn admission_gate(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    debug!(method = %req.method(), path = req.path(), "inbound request");

    let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
        return next.call(req).await.map(ServiceResponse::map_into_left_body);
    };

    let client = client_key(&req);
    match state.rate_limiter().admit(&client) {
        Admission::Allowed { .. } => next
            .call(req)
            .await
            .map(ServiceResponse::map_into_left_body),
        Admission::Rejected { retry_after } => {
            warn!(client = %client, path = req.path(), "rate limit exceeded");
            let mut response = ApiError::from(ErrorKind::RateLimited).error_response();
            // Round up so clients never retry inside the current window.
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
            Ok(req.into_response(response).map_into_right_body())
        }
    }
}

/// Turns a panic anywhere below this stage into the internal-error envelope
/// instead of a dropped connection.
pub async fn panic_guard(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let http_req = req.request().clone();
    let mode = req
        .app_data::<web::Data<AppState>>()
        .map(|state| state.mode())
        .unwrap_or(RuntimeMode::Production);

    match AssertUnwindSafe(next.call(req)).catch_unwind().await {
        Ok(result) => result.map(ServiceResponse::map_into_left_body),
        Err(panic) => {
            let detail = panic_detail(panic.as_ref());
            error!(path = http_req.path(), %detail, "request handler panicked");
            let response =
                ApiError::internal(INTERNAL_ERROR_MESSAGE, detail, mode).error_response();
            Ok(ServiceResponse::new(http_req, response).map_into_right_body())
        }
    }
}

fn panic_detail(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_string())
}

/// Rate-limit bucket for a request: the peer's IP address.
pub fn client_key(req: &ServiceRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
