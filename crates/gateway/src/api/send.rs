//! Outbound message endpoint.
//!
//! Accepts `multipart/form-data` with a `toNumber` field, an optional
//! `message` text field, and an optional `image` file part.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use zg_sessions::{OutboundMedia, OutboundMessage, SendOutcome};

use crate::api::{api_error, error_response};
use crate::state::AppState;

pub async fn send(
    State(state): State<AppState>,
    Path(name): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let mut to = None;
    let mut text = None;
    let mut media = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return api_error(StatusCode::BAD_REQUEST, format!("bad multipart body: {e}")),
        };
        match field.name() {
            Some("toNumber") => match field.text().await {
                Ok(value) => to = Some(value),
                Err(e) => {
                    return api_error(StatusCode::BAD_REQUEST, format!("bad toNumber field: {e}"))
                }
            },
            Some("message") => match field.text().await {
                Ok(value) => text = Some(value),
                Err(e) => {
                    return api_error(StatusCode::BAD_REQUEST, format!("bad message field: {e}"))
                }
            },
            Some("image") => {
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_owned();
                let filename = field.file_name().map(str::to_owned);
                match field.bytes().await {
                    Ok(data) => {
                        media = Some(OutboundMedia {
                            mime_type,
                            filename,
                            data: data.to_vec(),
                        })
                    }
                    Err(e) => {
                        return api_error(StatusCode::BAD_REQUEST, format!("bad image field: {e}"))
                    }
                }
            }
            // Unrecognized fields are skipped rather than rejected.
            _ => {}
        }
    }

    let to = match to {
        Some(value) if !value.trim().is_empty() => value,
        _ => return api_error(StatusCode::BAD_REQUEST, "toNumber is required"),
    };

    let outcome = state
        .dispatcher
        .send(&name, OutboundMessage { to, text, media })
        .await;

    match outcome {
        Ok(SendOutcome::Sent) => Json(json!({ "status": "sent" })).into_response(),
        Ok(SendOutcome::Partial {
            delivered,
            failed,
            error,
        }) => Json(json!({
            "status": "partial",
            "delivered": delivered.as_str(),
            "failed": failed.as_str(),
            "error": error,
        }))
        .into_response(),
        Err(error) => error_response(&error),
    }
}
