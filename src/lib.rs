#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Photo Processing Service
//!
//! An HTTP service that turns an uploaded portrait into one of two products:
//!
//! - **`gov`**: an ID photo. A U²-Net segmentation model (ONNX Runtime) separates the
//!   subject from the background and the cutout is flattened onto opaque white.
//! - **`profile`**: a profile picture. The photo is sent to an OpenAI-compatible
//!   image-edit API with a fixed prompt and the returned image is passed through.
//!
//! Both modes respond with a PNG. Failures map onto [`PhotoError`], which carries a
//! fixed HTTP status for every variant.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use photo_process::{
//!     api::{build_router, AppState},
//!     backends::OnnxBackend,
//!     config::ServerConfig,
//!     enhancement::ProfileEnhancer,
//!     pipeline::PhotoPipeline,
//!     segmentation::ModelSegmenter,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ServerConfig::builder()
//!     .model_path("./models/u2net.onnx")
//!     .api_key(std::env::var("OPENAI_API_KEY").ok())
//!     .build()?;
//!
//! let backend = OnnxBackend::load(&config.segmentation)?;
//! let segmenter = ModelSegmenter::new(backend, &config.segmentation);
//! let enhancer = ProfileEnhancer::from_config(config.enhancement.clone());
//! let pipeline = PhotoPipeline::new(Arc::new(segmenter), enhancer);
//!
//! let app = build_router(AppState::new(Arc::new(pipeline), config.max_upload_bytes));
//! let listener = tokio::net::TcpListener::bind(config.socket_addr()).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `onnx` (default): ONNX Runtime segmentation backend
//! - `cli` (default): the `photo-process` server binary
//! - `webp-support` (default): WebP uploads
//! - `tracing-json`: JSON log output

pub mod api;
pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod compositing;
pub mod config;
pub mod enhancement;
pub mod error;
pub mod inference;
pub mod pipeline;
pub mod segmentation;
pub mod services;
pub mod tracing_config;
pub mod utils;

pub use backends::*;
pub use config::{EnhancementConfig, ExecutionProvider, SegmentationConfig, ServerConfig};
pub use enhancement::{ImageEditClient, OpenAiImageClient, ProfileEnhancer};
pub use error::{PhotoError, Result};
pub use inference::InferenceBackend;
pub use pipeline::{PhotoPipeline, PhotoUpload, ProcessingMode};
pub use segmentation::{ModelSegmenter, SegmentationMask, Segmenter};
pub use services::ImageIOService;
pub use tracing_config::{TracingConfig, TracingFormat};
