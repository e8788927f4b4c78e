//! HTTP surface: router, handlers, and error responses
//!
//! Routes:
//! - `POST /process-photo`: multipart `image` + `mode`, responds with a PNG
//! - `GET /health`: liveness probe

mod error;
pub mod handlers;
pub mod router;

pub use error::ErrorBody;
pub use router::build_router;

use crate::pipeline::PhotoPipeline;
use std::sync::Arc;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<PhotoPipeline>,
    /// Request body limit applied to uploads
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(pipeline: Arc<PhotoPipeline>, max_upload_bytes: usize) -> Self {
        Self {
            pipeline,
            max_upload_bytes,
        }
    }
}
