//! HTTP surface of the gateway.

pub mod instances;
pub mod send;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use zg_domain::error::Error;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/initialize", post(instances::initialize))
        .route("/status/:name", get(instances::status))
        .route("/qrcode/:name", get(instances::qrcode))
        .route("/instancias", get(instances::list))
        .route("/disconnect/:name", post(instances::disconnect))
        .route("/send/:name", post(send::send))
}

/// Uniform `{ "error": ... }` body used by every failure path.
pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

pub(crate) fn error_response(error: &Error) -> Response {
    let status = match error {
        Error::NotFound(_) | Error::UnregisteredRecipient(_) => StatusCode::NOT_FOUND,
        Error::CapacityExceeded { .. } => StatusCode::FORBIDDEN,
        Error::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::InvalidRecipient(_) | Error::Config(_) | Error::Other(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, error.to_string())
}
