//! Instance lifecycle endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use zg_sessions::CreateOutcome;

use crate::api::{api_error, error_response};
use crate::qr;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InitRequest {
    #[serde(default)]
    pub name: String,
}

pub async fn initialize(
    State(state): State<AppState>,
    Json(request): Json<InitRequest>,
) -> Response {
    let name = request.name.trim();
    if name.is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "instance name is required");
    }

    match state.lifecycle.create_session(name).await {
        Ok(CreateOutcome::Created) => {
            Json(json!({ "status": "created", "name": name })).into_response()
        }
        Ok(CreateOutcome::AlreadyExists) => {
            Json(json!({ "status": "already_exists", "name": name })).into_response()
        }
        Err(error) => error_response(&error),
    }
}

pub async fn status(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.lifecycle.status(&name) {
        Some(ready) => Json(json!({ "ready": ready })).into_response(),
        None => api_error(StatusCode::NOT_FOUND, format!("unknown instance: {name}")),
    }
}

pub async fn qrcode(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.lifecycle.qr_challenge(&name) {
        None => api_error(StatusCode::NOT_FOUND, format!("unknown instance: {name}")),
        Some(Some(challenge)) => match qr::to_data_url(&challenge) {
            Ok(data_url) => Json(json!({ "qr": data_url })).into_response(),
            Err(error) => error_response(&error),
        },
        // No challenge outstanding: either already authorized, or the
        // platform has not issued one yet.
        Some(None) => {
            if state.lifecycle.status(&name) == Some(true) {
                Json(json!({ "qr": serde_json::Value::Null })).into_response()
            } else {
                api_error(StatusCode::NOT_FOUND, "qr code not yet issued")
            }
        }
    }
}

pub async fn list(State(state): State<AppState>) -> Response {
    let instances: Vec<_> = state
        .lifecycle
        .instance_names()
        .into_iter()
        .map(|name| json!({ "name": name }))
        .collect();
    Json(json!(instances)).into_response()
}

pub async fn disconnect(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.lifecycle.destroy_session(&name).await {
        Ok(()) => Json(json!({ "status": "disconnected", "name": name })).into_response(),
        Err(error) => error_response(&error),
    }
}
