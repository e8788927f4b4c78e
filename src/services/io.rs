//! In-memory image decoding and encoding
//!
//! Keeps codec details out of the request pipeline.

use crate::error::{PhotoError, Result};
use image::{ImageFormat, RgbImage};
use std::io::Cursor;

/// Service for converting between encoded bytes and bitmaps
pub struct ImageIOService;

impl ImageIOService {
    /// Decode image bytes into an RGB bitmap
    ///
    /// The format is detected from the content, not from any declared type.
    /// Alpha is dropped and grayscale is expanded.
    ///
    /// # Errors
    /// Returns `PhotoError::Decode` if the bytes are empty or not a supported image
    pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage> {
        if bytes.is_empty() {
            return Err(PhotoError::decode("Uploaded image is empty"));
        }

        let image = image::load_from_memory(bytes)
            .map_err(|e| PhotoError::decode(format!("Failed to decode image: {e}")))?;

        log::debug!(
            "Decoded {}x{} image ({:?})",
            image.width(),
            image.height(),
            image.color()
        );
        Ok(image.to_rgb8())
    }

    /// Encode an RGB bitmap as PNG
    ///
    /// # Errors
    /// Returns `PhotoError::Internal` if the encoder fails; this is not expected
    /// for a valid in-memory bitmap
    pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|e| PhotoError::internal(format!("Failed to encode PNG: {e}")))?;
        Ok(buffer.into_inner())
    }
}
