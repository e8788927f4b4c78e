//! Background segmentation
//!
//! [`Segmenter`] is the seam the gov branch calls through: RGB in, RGBA
//! cutout out (alpha = foreground confidence). [`ModelSegmenter`] implements
//! it on top of any [`InferenceBackend`] by preprocessing the image, running
//! the model, turning the prediction into a mask at the original resolution,
//! and attaching that mask as the alpha channel.

use crate::{
    config::SegmentationConfig,
    error::{PhotoError, Result},
    inference::InferenceBackend,
    utils::{ImagePreprocessor, PreprocessingConfig},
};
use image::{imageops::FilterType, GrayImage, RgbImage, RgbaImage};
use ndarray::Array4;
use std::time::Instant;
use tracing::{debug, instrument};

/// Produces a foreground cutout from an RGB image
pub trait Segmenter: Send + Sync {
    /// Return an RGBA image of the same dimensions whose alpha channel is the
    /// estimated foreground probability
    ///
    /// # Errors
    /// - Inference failures
    /// - Malformed model output
    fn remove_background(&self, image: &RgbImage) -> Result<RgbaImage>;
}

/// Single-channel foreground mask at the original image resolution
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationMask {
    /// Mask values, 0 = background, 255 = foreground
    pub data: Vec<u8>,
    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl SegmentationMask {
    #[must_use]
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Self {
        Self { data, dimensions }
    }

    /// Build a mask from a model output tensor
    ///
    /// Channel 0 of the first batch item is min-max normalized to `[0, 1]`
    /// and resized back to `original_dimensions`. A constant prediction
    /// yields an all-background mask.
    ///
    /// # Errors
    /// - Tensor that is not `[1, >=1, H, W]` with non-zero spatial size
    /// - Non-finite prediction values
    pub fn from_tensor(tensor: &Array4<f32>, original_dimensions: (u32, u32)) -> Result<Self> {
        let shape = tensor.shape();
        let (channels, height, width) = (
            shape.get(1).copied().unwrap_or(0),
            shape.get(2).copied().unwrap_or(0),
            shape.get(3).copied().unwrap_or(0),
        );
        if shape.first().copied().unwrap_or(0) < 1 || channels < 1 || height == 0 || width == 0 {
            return Err(PhotoError::processing(format!(
                "Invalid output tensor shape {shape:?}"
            )));
        }

        let prediction = tensor.slice(ndarray::s![0, 0, .., ..]);
        if prediction.iter().any(|v| !v.is_finite()) {
            return Err(PhotoError::processing("Model output contains non-finite values"));
        }

        let (min, max) = prediction
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let range = max - min;

        let mut small = GrayImage::new(width as u32, height as u32);
        for ((y, x), &value) in prediction.indexed_iter() {
            let normalized = if range > f32::EPSILON {
                (value - min) / range
            } else {
                0.0
            };
            small.put_pixel(
                x as u32,
                y as u32,
                image::Luma([(normalized.clamp(0.0, 1.0) * 255.0) as u8]),
            );
        }

        let (orig_width, orig_height) = original_dimensions;
        let mask = if small.dimensions() == original_dimensions {
            small
        } else {
            image::imageops::resize(&small, orig_width, orig_height, FilterType::Lanczos3)
        };

        Ok(Self::new(mask.into_raw(), original_dimensions))
    }

    /// Attach the mask as the alpha channel of `image`
    ///
    /// # Errors
    /// - Mask and image dimensions differ
    pub fn apply_to(&self, image: &RgbImage) -> Result<RgbaImage> {
        if image.dimensions() != self.dimensions {
            return Err(PhotoError::processing(format!(
                "Mask dimensions {:?} do not match image dimensions {:?}",
                self.dimensions,
                image.dimensions()
            )));
        }

        let (width, _) = self.dimensions;
        let mut cutout = RgbaImage::new(image.width(), image.height());
        for (x, y, pixel) in image.enumerate_pixels() {
            let alpha = self
                .data
                .get((y * width + x) as usize)
                .copied()
                .unwrap_or(0);
            cutout.put_pixel(x, y, image::Rgba([pixel[0], pixel[1], pixel[2], alpha]));
        }
        Ok(cutout)
    }
}

/// Segmenter backed by a loaded inference model
pub struct ModelSegmenter<B: InferenceBackend> {
    backend: B,
    preprocessing: PreprocessingConfig,
}

impl<B: InferenceBackend> ModelSegmenter<B> {
    #[must_use]
    pub fn new(backend: B, config: &SegmentationConfig) -> Self {
        let preprocessing = PreprocessingConfig::from_segmentation(config, backend.input_size());
        Self {
            backend,
            preprocessing,
        }
    }

    /// The underlying inference backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run the model and return the mask without applying it
    ///
    /// # Errors
    /// - Preprocessing, inference, or mask conversion failures
    pub fn segment_foreground(&self, image: &RgbImage) -> Result<SegmentationMask> {
        let start = Instant::now();
        let input_tensor = ImagePreprocessor::preprocess_for_inference(image, &self.preprocessing)?;
        let preprocess_ms = start.elapsed().as_millis();

        let output_tensor = self.backend.infer(&input_tensor)?;
        let inference_ms = start.elapsed().as_millis() - preprocess_ms;

        let mask = SegmentationMask::from_tensor(&output_tensor, image.dimensions())?;
        debug!(
            preprocess_ms,
            inference_ms,
            total_ms = start.elapsed().as_millis(),
            "Segmentation mask generated"
        );
        Ok(mask)
    }
}

impl<B: InferenceBackend> Segmenter for ModelSegmenter<B> {
    #[instrument(
        skip(self, image),
        fields(
            backend = %self.backend.name(),
            dimensions = %format!("{}x{}", image.width(), image.height())
        )
    )]
    fn remove_background(&self, image: &RgbImage) -> Result<RgbaImage> {
        let mask = self.segment_foreground(image)?;
        mask.apply_to(image)
    }
}
