//! Configuration types for the photo processing service

use crate::error::{PhotoError, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Default listening port when `PORT` is unset
pub const DEFAULT_PORT: u16 = 10000;

/// Default location of the segmentation model
pub const DEFAULT_MODEL_PATH: &str = "./models/u2net.onnx";

/// Default base URL of the image editing API
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Fixed prompt sent with every profile enhancement request
pub const PROFILE_PROMPT: &str = "enhance selfie, smooth skin, natural light, clear background";

/// Default request body limit (20 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Execution provider options for ONNX Runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExecutionProvider {
    /// Auto-detect best available provider (CUDA > `CoreML` > CPU)
    #[default]
    Auto,
    /// CPU execution (always available)
    Cpu,
    /// NVIDIA CUDA GPU acceleration
    Cuda,
    /// Apple Silicon GPU acceleration
    CoreMl,
}

impl std::fmt::Display for ExecutionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda => write!(f, "cuda"),
            Self::CoreMl => write!(f, "coreml"),
        }
    }
}

impl std::str::FromStr for ExecutionProvider {
    type Err = PhotoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda),
            "coreml" => Ok(Self::CoreMl),
            other => Err(PhotoError::invalid_config(format!(
                "Unknown execution provider '{other}' (expected auto, cpu, cuda or coreml)"
            ))),
        }
    }
}

/// Settings for the background-removal model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationConfig {
    /// Path to the ONNX segmentation model
    pub model_path: PathBuf,
    /// Execution provider for the inference session
    pub execution_provider: ExecutionProvider,
    /// Number of intra-op threads (0 = auto)
    pub intra_threads: usize,
    /// Square spatial input size of the model (320 for U²-Net)
    pub input_size: u32,
    /// Per-channel normalization mean (RGB)
    pub normalization_mean: [f32; 3],
    /// Per-channel normalization standard deviation (RGB)
    pub normalization_std: [f32; 3],
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            execution_provider: ExecutionProvider::Auto,
            intra_threads: 0,
            input_size: 320,
            normalization_mean: [0.485, 0.456, 0.406],
            normalization_std: [0.229, 0.224, 0.225],
        }
    }
}

/// Settings for the remote enhancement branch
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementConfig {
    /// Credential for the editing API; `None` disables profile mode
    pub api_key: Option<String>,
    /// Base URL of the editing API (without trailing `/images/edits`)
    pub base_url: String,
    /// Optional model name forwarded to the API
    pub model: Option<String>,
    /// Prompt sent with every request
    pub prompt: String,
}

impl EnhancementConfig {
    /// Whether a usable credential is present
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.trim().is_empty())
    }
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: None,
            prompt: PROFILE_PROMPT.to_string(),
        }
    }
}

impl std::fmt::Debug for EnhancementConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnhancementConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("prompt", &self.prompt)
            .finish()
    }
}

/// Complete server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub host: IpAddr,
    /// Listening port
    pub port: u16,
    /// Request body limit in bytes
    pub max_upload_bytes: usize,
    /// Background-removal model settings
    pub segmentation: SegmentationConfig,
    /// Remote enhancement settings
    pub enhancement: EnhancementConfig,
}

impl ServerConfig {
    /// Create a new server configuration builder
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }

    /// Socket address to bind
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            segmentation: SegmentationConfig::default(),
            enhancement: EnhancementConfig::default(),
        }
    }
}

/// Builder for `ServerConfig`
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    #[must_use]
    pub fn host(mut self, host: IpAddr) -> Self {
        self.config.host = host;
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    #[must_use]
    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    #[must_use]
    pub fn model_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.segmentation.model_path = path.into();
        self
    }

    #[must_use]
    pub fn execution_provider(mut self, provider: ExecutionProvider) -> Self {
        self.config.segmentation.execution_provider = provider;
        self
    }

    #[must_use]
    pub fn intra_threads(mut self, threads: usize) -> Self {
        self.config.segmentation.intra_threads = threads;
        self
    }

    /// Set the credential; blank values are treated as absent
    #[must_use]
    pub fn api_key(mut self, key: Option<String>) -> Self {
        self.config.enhancement.api_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    #[must_use]
    pub fn openai_base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.enhancement.base_url = url.into();
        self
    }

    #[must_use]
    pub fn openai_model(mut self, model: Option<String>) -> Self {
        self.config.enhancement.model = model.filter(|m| !m.trim().is_empty());
        self
    }

    /// Build the server configuration
    ///
    /// # Errors
    ///
    /// Returns `PhotoError::InvalidConfig` for:
    /// - Port 0
    /// - Empty model path
    /// - Zero upload limit
    /// - Empty upstream base URL
    pub fn build(mut self) -> Result<ServerConfig> {
        if self.config.port == 0 {
            return Err(PhotoError::invalid_config("Port must be between 1 and 65535"));
        }
        if self.config.segmentation.model_path.as_os_str().is_empty() {
            return Err(PhotoError::invalid_config("Model path must not be empty"));
        }
        if self.config.max_upload_bytes == 0 {
            return Err(PhotoError::invalid_config(
                "Upload limit must be greater than zero",
            ));
        }

        let base_url = self.config.enhancement.base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(PhotoError::invalid_config("Upstream base URL must not be empty"));
        }
        self.config.enhancement.base_url = base_url.to_string();

        Ok(self.config)
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
