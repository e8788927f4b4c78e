//! Request pipeline: validate → decode → dispatch on mode → encode
//!
//! Each request runs once through [`PhotoPipeline::handle`]. The segmentation
//! model is injected at construction and shared read-only by all requests.

use crate::{
    compositing::composite_on_white,
    enhancement::ProfileEnhancer,
    error::{PhotoError, Result},
    segmentation::Segmenter,
    services::ImageIOService,
};
use image::RgbImage;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Processing mode selected by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingMode {
    /// ID photo: background removed and replaced with white
    Gov,
    /// Profile photo: cosmetic enhancement by the remote editing API
    Profile,
}

impl ProcessingMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gov => "gov",
            Self::Profile => "profile",
        }
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingMode {
    type Err = PhotoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gov" => Ok(Self::Gov),
            "profile" => Ok(Self::Profile),
            _ => Err(PhotoError::invalid_input("mode must be 'gov' or 'profile'")),
        }
    }
}

/// An uploaded file as received from the client
#[derive(Debug, Clone, Default)]
pub struct PhotoUpload {
    /// Declared MIME type of the file part
    pub content_type: Option<String>,
    /// Original file name, if the client sent one
    pub file_name: Option<String>,
    /// Raw file bytes
    pub bytes: Vec<u8>,
}

/// Checks the declared content type and mode before any decoding
pub struct RequestValidator;

impl RequestValidator {
    /// Validate the raw form fields
    ///
    /// # Errors
    /// Returns `PhotoError::InvalidInput` when the image is missing, its
    /// content type does not start with `image/`, or the mode is missing or
    /// not one of `gov`/`profile`
    pub fn validate(image: Option<&PhotoUpload>, mode: Option<&str>) -> Result<ProcessingMode> {
        let upload = image.ok_or_else(|| PhotoError::invalid_input("an image file is required"))?;

        let is_image = upload
            .content_type
            .as_deref()
            .is_some_and(|content_type| content_type.starts_with("image/"));
        if !is_image {
            return Err(PhotoError::invalid_input(
                "an image file is required (content type must be image/*)",
            ));
        }

        mode.ok_or_else(|| PhotoError::invalid_input("mode is required"))?
            .parse()
    }
}

/// The photo processing pipeline shared by all requests
pub struct PhotoPipeline {
    segmenter: Arc<dyn Segmenter>,
    enhancer: ProfileEnhancer,
}

impl PhotoPipeline {
    #[must_use]
    pub fn new(segmenter: Arc<dyn Segmenter>, enhancer: ProfileEnhancer) -> Self {
        Self {
            segmenter,
            enhancer,
        }
    }

    /// Whether profile mode has a credential
    #[must_use]
    pub fn profile_enabled(&self) -> bool {
        self.enhancer.is_configured()
    }

    /// Run a full request and return the PNG body
    ///
    /// # Errors
    /// Any member of the [`PhotoError`] taxonomy; see [`RequestValidator`],
    /// [`ImageIOService::decode_rgb`] and [`PhotoPipeline::process_image`]
    pub async fn handle(&self, image: Option<PhotoUpload>, mode: Option<&str>) -> Result<Vec<u8>> {
        let mode = RequestValidator::validate(image.as_ref(), mode)?;
        let upload = image.ok_or_else(|| PhotoError::invalid_input("an image file is required"))?;

        let input = ImageIOService::decode_rgb(&upload.bytes)?;
        let output = self.process_image(input, mode).await?;
        ImageIOService::encode_png(&output)
    }

    /// Dispatch a decoded image to the branch selected by `mode`
    ///
    /// # Errors
    /// - `Processing` when background removal fails (gov)
    /// - `NotConfigured`, `UpstreamEmpty` or `Upstream` from the profile branch
    #[instrument(
        skip(self, image),
        fields(mode = %mode, width = image.width(), height = image.height())
    )]
    pub async fn process_image(&self, image: RgbImage, mode: ProcessingMode) -> Result<RgbImage> {
        let output = match mode {
            ProcessingMode::Gov => self.remove_background(image).await?,
            ProcessingMode::Profile => self.enhancer.enhance(&image).await?,
        };
        info!(
            width = output.width(),
            height = output.height(),
            "Photo processed"
        );
        Ok(output)
    }

    async fn remove_background(&self, image: RgbImage) -> Result<RgbImage> {
        let segmenter = Arc::clone(&self.segmenter);
        let expected = image.dimensions();

        let result = tokio::task::spawn_blocking(move || {
            let cutout = segmenter.remove_background(&image)?;
            if cutout.dimensions() != expected {
                return Err(PhotoError::processing(format!(
                    "segmentation returned {}x{} for a {}x{} image",
                    cutout.width(),
                    cutout.height(),
                    expected.0,
                    expected.1
                )));
            }
            Ok(composite_on_white(&cutout))
        })
        .await
        .map_err(|e| PhotoError::processing(format!("segmentation task failed: {e}")))
        .and_then(|inner| inner);

        result.map_err(|e| {
            error!(error = %e, "Background removal failed");
            match e {
                PhotoError::Processing(_) => e,
                other => PhotoError::processing(other.to_string()),
            }
        })
    }
}
