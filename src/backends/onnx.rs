//! ONNX Runtime backend for the background segmentation model
//!
//! Loads the model file once and keeps the session for the lifetime of the
//! process. Supports CPU, CUDA and `CoreML` execution providers.

use crate::config::{ExecutionProvider, SegmentationConfig};
use crate::error::{PhotoError, Result};
use crate::inference::InferenceBackend;
use ndarray::Array4;
use ort::execution_providers::{
    CUDAExecutionProvider, CoreMLExecutionProvider, ExecutionProvider as OrtExecutionProvider,
    ExecutionProviderDispatch,
};
use ort::session::{builder::GraphOptimizationLevel, builder::SessionBuilder, Session};
use ort::{self, value::Value};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// ONNX Runtime backend for running the segmentation model
#[derive(Debug)]
pub struct OnnxBackend {
    // `Session::run` needs `&mut`; the mutex is the only writer
    session: Mutex<Session>,
    model_path: PathBuf,
    name: String,
    input_size: u32,
    load_time: Duration,
}

impl OnnxBackend {
    /// List ONNX Runtime execution providers with availability status
    pub fn list_providers() -> Vec<(String, bool)> {
        let cuda_available =
            OrtExecutionProvider::is_available(&CUDAExecutionProvider::default()).unwrap_or(false);
        let coreml_available =
            OrtExecutionProvider::is_available(&CoreMLExecutionProvider::default())
                .unwrap_or(false);

        vec![
            ("CPU".to_string(), true),
            ("CUDA".to_string(), cuda_available),
            ("CoreML".to_string(), coreml_available),
        ]
    }

    /// Load the model file and create the inference session
    ///
    /// # Errors
    /// - Model file missing or unreadable
    /// - ONNX Runtime session creation failures
    pub fn load(config: &SegmentationConfig) -> Result<Self> {
        let model_load_start = Instant::now();
        let model_path = config.model_path.clone();

        if !model_path.is_file() {
            return Err(PhotoError::model_error_with_context(
                "load",
                &model_path,
                "file not found",
                &["check MODEL_PATH", "place u2net.onnx under ./models"],
            ));
        }

        let session_builder = Session::builder()
            .map_err(|e| PhotoError::model(format!("Failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| PhotoError::model(format!("Failed to set optimization level: {e}")))?;

        let session_builder =
            Self::configure_execution_providers(session_builder, config.execution_provider)?;

        let intra_threads = if config.intra_threads > 0 {
            config.intra_threads
        } else {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(4)
        };

        let session = session_builder
            .with_intra_threads(intra_threads)
            .map_err(|e| PhotoError::model(format!("Failed to set intra threads: {e}")))?
            .commit_from_file(&model_path)
            .map_err(|e| {
                PhotoError::model_error_with_context(
                    "create session from",
                    &model_path,
                    &e.to_string(),
                    &["verify the file is a valid ONNX model"],
                )
            })?;

        let name = model_path
            .file_stem()
            .map_or_else(|| "onnx-model".to_string(), |s| s.to_string_lossy().into_owned());

        let load_time = model_load_start.elapsed();
        log::info!(
            "📊 Model '{}' loaded in {:.0}ms ({} intra-op threads, provider {})",
            name,
            load_time.as_secs_f64() * 1000.0,
            intra_threads,
            config.execution_provider
        );

        Ok(Self {
            session: Mutex::new(session),
            model_path,
            name,
            input_size: config.input_size,
            load_time,
        })
    }

    /// Register the requested provider, falling back to CPU when unavailable
    fn configure_execution_providers(
        session_builder: SessionBuilder,
        provider: ExecutionProvider,
    ) -> Result<SessionBuilder> {
        let cuda = CUDAExecutionProvider::default();
        let coreml = CoreMLExecutionProvider::default().with_subgraphs(true);
        let cuda_available = OrtExecutionProvider::is_available(&cuda).unwrap_or(false);
        let coreml_available = OrtExecutionProvider::is_available(&coreml).unwrap_or(false);

        // Auto order: CUDA, then CoreML, then the implicit CPU provider
        let selected: Vec<ExecutionProviderDispatch> = match provider {
            ExecutionProvider::Auto => [
                cuda_available.then(|| cuda.build()),
                coreml_available.then(|| coreml.build()),
            ]
            .into_iter()
            .flatten()
            .collect(),
            ExecutionProvider::Cpu => Vec::new(),
            ExecutionProvider::Cuda if cuda_available => vec![cuda.build()],
            ExecutionProvider::CoreMl if coreml_available => vec![coreml.build()],
            ExecutionProvider::Cuda | ExecutionProvider::CoreMl => {
                log::warn!("{provider} execution provider requested but not available, using CPU");
                Vec::new()
            },
        };

        if selected.is_empty() {
            log::info!("Using CPU execution provider");
            return Ok(session_builder);
        }

        log::info!(
            "🚀 Registering {} accelerated execution provider(s) for '{provider}' (CUDA: {cuda_available}, CoreML: {coreml_available})",
            selected.len()
        );
        session_builder
            .with_execution_providers(selected)
            .map_err(|e| PhotoError::model(format!("Failed to set execution providers: {e}")))
    }

    /// Path the model was loaded from
    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Time spent creating the session
    #[must_use]
    pub fn load_time(&self) -> Duration {
        self.load_time
    }
}

impl InferenceBackend for OnnxBackend {
    fn infer(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let inference_start = Instant::now();
        log::debug!("🚀 Starting inference with input shape: {:?}", input.dim());

        let input_value = Value::from_array(input.clone()).map_err(|e| {
            PhotoError::processing(format!("Failed to convert input tensor: {e}"))
        })?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| PhotoError::internal("ONNX session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| PhotoError::processing(format!("ONNX inference failed: {e}")))?;

        // U²-Net exposes several side outputs; the fused prediction comes first
        let output_tensor = {
            let keys: Vec<_> = outputs.keys().collect();
            let first_key = keys
                .first()
                .ok_or_else(|| PhotoError::processing("No output tensors found"))?;
            outputs
                .get(first_key)
                .ok_or_else(|| PhotoError::processing("First output tensor not found"))?
                .try_extract_array::<f32>()
                .map_err(|e| {
                    PhotoError::processing(format!("Failed to extract output tensor: {e}"))
                })?
        };

        let output_shape = output_tensor.shape().to_vec();
        if output_shape.len() != 4 {
            return Err(PhotoError::processing(format!(
                "Expected 4D output tensor, got {}D",
                output_shape.len()
            )));
        }

        let output_data = output_tensor.view().to_owned();
        let result = Array4::from_shape_vec(
            (
                output_shape.first().copied().unwrap_or(1),
                output_shape.get(1).copied().unwrap_or(1),
                output_shape.get(2).copied().unwrap_or(1),
                output_shape.get(3).copied().unwrap_or(1),
            ),
            output_data.into_raw_vec_and_offset().0,
        )
        .map_err(|e| PhotoError::processing(format!("Failed to reshape output tensor: {e}")))?;

        log::debug!(
            "📊 Inference complete: {:.2}ms",
            inference_start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(result)
    }

    fn input_size(&self) -> u32 {
        self.input_size
    }

    fn name(&self) -> &str {
        &self.name
    }
}
