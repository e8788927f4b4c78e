//! Remote profile-photo enhancement
//!
//! The profile branch delegates all image work to an external editing API.
//! [`ImageEditClient`] is the transport seam; [`OpenAiImageClient`] speaks the
//! OpenAI-compatible `images/edits` endpoint. [`ProfileEnhancer`] owns the
//! branch rules: credential check, PNG re-encoding, payload extraction and
//! error classification.

use crate::{
    config::EnhancementConfig,
    error::{PhotoError, Result},
    services::ImageIOService,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use image::RgbImage;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// One edit request sent upstream
#[derive(Debug, Clone)]
pub struct ImageEditRequest {
    /// PNG-encoded source image
    pub image_png: Vec<u8>,
    /// Edit instruction
    pub prompt: String,
    /// Number of results requested
    pub n: u8,
    /// Optional upstream model name
    pub model: Option<String>,
}

/// Upstream response body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditResponse {
    #[serde(default)]
    pub data: Vec<EditedImage>,
}

/// One generated image in the upstream response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditedImage {
    #[serde(default)]
    pub b64_json: Option<String>,
}

impl EditResponse {
    /// Base64 payload of the first result, if any
    #[must_use]
    pub fn first_payload(&self) -> Option<&str> {
        self.data
            .first()
            .and_then(|image| image.b64_json.as_deref())
            .map(str::trim)
            .filter(|payload| !payload.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Transport to an image editing service
#[async_trait]
pub trait ImageEditClient: Send + Sync {
    /// Submit one edit request
    ///
    /// # Errors
    /// Returns `PhotoError::Upstream` for network failures, non-success
    /// statuses and unparseable responses
    async fn edit_image(&self, api_key: &str, request: ImageEditRequest) -> Result<EditResponse>;
}

/// Client for the OpenAI-compatible `POST {base_url}/images/edits` endpoint
#[derive(Debug, Clone)]
pub struct OpenAiImageClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenAiImageClient {
    #[must_use]
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self::with_http_client(reqwest::Client::new(), base_url)
    }

    #[must_use]
    pub fn with_http_client<S: Into<String>>(http: reqwest::Client, base_url: S) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    /// Full URL of the edits endpoint
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/images/edits", self.base_url)
    }
}

#[async_trait]
impl ImageEditClient for OpenAiImageClient {
    async fn edit_image(&self, api_key: &str, request: ImageEditRequest) -> Result<EditResponse> {
        let image_part = reqwest::multipart::Part::bytes(request.image_png)
            .file_name("image.png")
            .mime_str("image/png")
            .map_err(|e| PhotoError::upstream(format!("Failed to build upload part: {e}")))?;

        let mut form = reqwest::multipart::Form::new()
            .part("image", image_part)
            .text("prompt", request.prompt)
            .text("n", request.n.to_string())
            .text("response_format", "b64_json");
        if let Some(model) = request.model {
            form = form.text("model", model);
        }

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PhotoError::upstream(format!("Request to image API failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|parsed| parsed.error.message)
                .unwrap_or(body);
            return Err(PhotoError::upstream(format!(
                "Image API returned {status}: {message}"
            )));
        }

        response
            .json::<EditResponse>()
            .await
            .map_err(|e| PhotoError::upstream(format!("Invalid image API response: {e}")))
    }
}

/// The profile-mode branch
pub struct ProfileEnhancer {
    config: EnhancementConfig,
    client: Arc<dyn ImageEditClient>,
}

impl ProfileEnhancer {
    #[must_use]
    pub fn new(config: EnhancementConfig, client: Arc<dyn ImageEditClient>) -> Self {
        Self { config, client }
    }

    /// Build an enhancer that talks to the configured OpenAI-compatible API
    #[must_use]
    pub fn from_config(config: EnhancementConfig) -> Self {
        let client = Arc::new(OpenAiImageClient::new(config.base_url.clone()));
        Self::new(config, client)
    }

    /// Whether profile mode can run
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Send the image upstream and decode the edited result
    ///
    /// # Errors
    /// - `NotConfigured` when no credential is set (no request is made)
    /// - `UpstreamEmpty` when the response carries no image payload
    /// - `Upstream` for transport failures, bad base64 or an undecodable result
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub async fn enhance(&self, image: &RgbImage) -> Result<RgbImage> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                PhotoError::not_configured("profile mode requires OPENAI_API_KEY to be set")
            })?;

        let request = ImageEditRequest {
            image_png: ImageIOService::encode_png(image)?,
            prompt: self.config.prompt.clone(),
            n: 1,
            model: self.config.model.clone(),
        };
        debug!(bytes = request.image_png.len(), "Sending image to editing API");

        let response = self
            .client
            .edit_image(api_key, request)
            .await
            .map_err(|e| {
                warn!(error = %e, "Image edit request failed");
                match e {
                    PhotoError::Upstream(_) | PhotoError::UpstreamEmpty(_) => e,
                    other => PhotoError::upstream(other.to_string()),
                }
            })?;

        let payload = response.first_payload().ok_or_else(|| {
            warn!("Image API response contained no image payload");
            PhotoError::upstream_empty("image API response contained no image")
        })?;

        let bytes = BASE64_STANDARD.decode(payload).map_err(|e| {
            warn!(error = %e, "Image API returned invalid base64");
            PhotoError::upstream(format!("Invalid base64 image payload: {e}"))
        })?;

        ImageIOService::decode_rgb(&bytes).map_err(|e| {
            warn!(error = %e, "Image API returned an undecodable image");
            PhotoError::upstream(format!("Returned image could not be decoded: {e}"))
        })
    }
}
