use actix_web::{
    dev::ServiceResponse,
    http::{header, StatusCode},
    middleware::ErrorHandlerResponse,
    web, HttpResponse, ResponseError,
};
use movie_gateway_domain::{ErrorKind, RuntimeMode};

use crate::state::AppState;

use super::{ApiError, INTERNAL_ERROR_MESSAGE};

pub async fn not_found_handler() -> Result<HttpResponse, ApiError> {
    Err(ErrorKind::NotFound.into())
}

/// Replaces framework-generated error bodies (405 on a known path, 500s
/// nobody rendered) with failure envelopes. Responses that already carry
/// JSON are envelopes from our own handlers and pass through untouched.
pub fn rewrite_error_response<B>(
    res: ServiceResponse<B>,
) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let is_json = res
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));
    if is_json {
        return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
    }

    let replacement = match res.status() {
        StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_FOUND => {
            ApiError::from(ErrorKind::NotFound)
        }
        _ => {
            let mode = res
                .request()
                .app_data::<web::Data<AppState>>()
                .map(|state| state.mode())
                .unwrap_or(RuntimeMode::Production);
            let detail = res
                .response()
                .error()
                .map(ToString::to_string)
                .unwrap_or_else(|| res.status().to_string());
            tracing::error!(status = %res.status(), %detail, "unhandled server error");
            ApiError::internal(INTERNAL_ERROR_MESSAGE, detail, mode)
        }
    };

    let (req, _) = res.into_parts();
    let response = replacement.error_response();
    Ok(ErrorHandlerResponse::Response(
        ServiceResponse::new(req, response).map_into_right_body(),
    ))
}
