//! Image preprocessing for segmentation inference

use crate::{
    config::SegmentationConfig,
    error::{PhotoError, Result},
};
use image::{imageops::FilterType, RgbImage};
use ndarray::Array4;

/// Normalization applied to every input pixel
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessingConfig {
    /// Square spatial size of the model input
    pub target_size: u32,
    /// Per-channel mean (RGB)
    pub normalization_mean: [f32; 3],
    /// Per-channel standard deviation (RGB)
    pub normalization_std: [f32; 3],
}

impl PreprocessingConfig {
    #[must_use]
    pub fn from_segmentation(config: &SegmentationConfig, target_size: u32) -> Self {
        Self {
            target_size,
            normalization_mean: config.normalization_mean,
            normalization_std: config.normalization_std,
        }
    }
}

/// Image to tensor conversion
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Preprocess an RGB image for model inference
    ///
    /// This function handles:
    /// - Stretch resize to a `target_size` square (Lanczos3)
    /// - Scaling by the brightest channel value
    /// - Mean/std normalization to NCHW layout
    ///
    /// # Errors
    /// - Zero target size
    /// - Zero-sized input image
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn preprocess_for_inference(
        image: &RgbImage,
        config: &PreprocessingConfig,
    ) -> Result<Array4<f32>> {
        let target_size = config.target_size;
        if target_size == 0 {
            return Err(PhotoError::processing("Model input size must be non-zero"));
        }
        if image.width() == 0 || image.height() == 0 {
            return Err(PhotoError::processing("Cannot preprocess an empty image"));
        }

        let resized =
            image::imageops::resize(image, target_size, target_size, FilterType::Lanczos3);

        let max_value = resized
            .as_raw()
            .iter()
            .copied()
            .max()
            .map_or(0.0, f32::from)
            .max(1e-6);

        Ok(Self::canvas_to_tensor(&resized, config, max_value))
    }

    fn canvas_to_tensor(canvas: &RgbImage, config: &PreprocessingConfig, max_value: f32) -> Array4<f32> {
        let size = config.target_size as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

        #[allow(clippy::indexing_slicing)]
        // Safe: tensor dimensions pre-allocated to match canvas size
        for (x, y, pixel) in canvas.enumerate_pixels() {
            for channel in 0..3 {
                let value = f32::from(pixel[channel]) / max_value;
                tensor[[0, channel, y as usize, x as usize]] = (value
                    - config.normalization_mean[channel])
                    / config.normalization_std[channel];
            }
        }

        tensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn create_test_config(target_size: u32) -> PreprocessingConfig {
        PreprocessingConfig {
            target_size,
            normalization_mean: [0.485, 0.456, 0.406],
            normalization_std: [0.229, 0.224, 0.225],
        }
    }

    #[test]
    fn test_preprocess_shape() {
        let image = RgbImage::from_pixel(100, 60, Rgb([255, 0, 0]));
        let tensor =
            ImagePreprocessor::preprocess_for_inference(&image, &create_test_config(320)).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 320, 320]);
    }

    #[test]
    fn test_preprocess_normalization() {
        let image = RgbImage::from_pixel(8, 8, Rgb([255, 0, 0]));
        let config = create_test_config(8);
        let tensor = ImagePreprocessor::preprocess_for_inference(&image, &config).unwrap();

        // Red channel: 255 / 255 = 1.0, then normalized
        let expected_r = (1.0 - 0.485) / 0.229;
        let expected_g = (0.0 - 0.456) / 0.224;
        assert!((tensor[[0, 0, 4, 4]] - expected_r).abs() < 1e-4);
        assert!((tensor[[0, 1, 4, 4]] - expected_g).abs() < 1e-4);
    }

    #[test]
    fn test_preprocess_scales_by_max_value() {
        // A dim image is stretched to full range before normalization
        let image = RgbImage::from_pixel(4, 4, Rgb([100, 50, 0]));
        let tensor =
            ImagePreprocessor::preprocess_for_inference(&image, &create_test_config(4)).unwrap();

        let expected_r = (1.0 - 0.485) / 0.229;
        let expected_g = (0.5 - 0.456) / 0.224;
        assert!((tensor[[0, 0, 0, 0]] - expected_r).abs() < 1e-4);
        assert!((tensor[[0, 1, 0, 0]] - expected_g).abs() < 1e-4);
    }

    #[test]
    fn test_preprocess_black_image_does_not_divide_by_zero() {
        let image = RgbImage::new(4, 4);
        let tensor =
            ImagePreprocessor::preprocess_for_inference(&image, &create_test_config(4)).unwrap();
        assert!(tensor.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_preprocess_rejects_zero_target() {
        let image = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));
        assert!(ImagePreprocessor::preprocess_for_inference(&image, &create_test_config(0)).is_err());
    }
}
