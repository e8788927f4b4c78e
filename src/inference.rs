//! Inference backend abstraction

use crate::error::Result;
use ndarray::Array4;

/// Trait for segmentation inference backends
///
/// A backend is loaded once at startup and then shared read-only between
/// requests, so `infer` takes `&self`. Backends that need exclusive access
/// to their runtime handle serialize internally.
pub trait InferenceBackend: Send + Sync {
    /// Run inference on a normalized NCHW input tensor
    ///
    /// # Errors
    /// - Model inference failures
    /// - Tensor conversion or output extraction errors
    fn infer(&self, input: &Array4<f32>) -> Result<Array4<f32>>;

    /// Square spatial size the model expects (`H == W`)
    fn input_size(&self) -> u32;

    /// Human-readable backend/model name for logging
    fn name(&self) -> &str;
}

impl<B: InferenceBackend + ?Sized> InferenceBackend for Box<B> {
    fn infer(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
        (**self).infer(input)
    }

    fn input_size(&self) -> u32 {
        (**self).input_size()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
