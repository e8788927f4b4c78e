//! Request handlers

use super::AppState;
use crate::error::{PhotoError, Result};
use crate::pipeline::PhotoUpload;
use crate::tracing_config::spans;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, Instrument};

/// Name of the multipart file field
pub const IMAGE_FIELD: &str = "image";
/// Name of the multipart mode field
pub const MODE_FIELD: &str = "mode";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// `POST /process-photo`
///
/// Reads the `image` and `mode` fields, runs the pipeline, and responds with
/// the processed PNG. Unknown fields are ignored.
pub async fn process_photo(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = spans::request(&request_id, "/process-photo");

    async move {
        let mut multipart = multipart.map_err(|rejection| {
            PhotoError::invalid_input(format!("expected a multipart form: {}", rejection.body_text()))
        })?;
        let form = read_form(&mut multipart).await?;

        if let Some(mode) = form.mode.as_deref() {
            tracing::Span::current().record("mode", mode);
        }
        if let Some(image) = form.image.as_ref() {
            debug!(
                bytes = image.bytes.len(),
                content_type = image.content_type.as_deref().unwrap_or("-"),
                "Received upload"
            );
        }

        let png = state.pipeline.handle(form.image, form.mode.as_deref()).await?;
        Ok(png_response(png))
    }
    .instrument(span)
    .await
}

#[derive(Debug, Default)]
struct PhotoForm {
    image: Option<PhotoUpload>,
    mode: Option<String>,
}

async fn read_form(multipart: &mut Multipart) -> Result<PhotoForm> {
    let mut form = PhotoForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(IMAGE_FIELD) => {
                let content_type = field.content_type().map(str::to_owned);
                let file_name = field.file_name().map(str::to_owned);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.image = Some(PhotoUpload {
                    content_type,
                    file_name,
                    bytes: bytes.to_vec(),
                });
            },
            Some(MODE_FIELD) => {
                form.mode = Some(field.text().await.map_err(multipart_error)?);
            },
            _ => {},
        }
    }

    Ok(form)
}

fn multipart_error(err: MultipartError) -> PhotoError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        PhotoError::payload_too_large(err.body_text())
    } else {
        PhotoError::invalid_input(format!("malformed multipart body: {}", err.body_text()))
    }
}

fn png_response(png: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CONTENT_DISPOSITION, "inline; filename=processed.png"),
        ],
        png,
    )
        .into_response()
}
