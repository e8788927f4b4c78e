//! Error types for photo processing operations

use thiserror::Error;

/// Result type alias for photo processing operations
pub type Result<T> = std::result::Result<T, PhotoError>;

/// Failure taxonomy for a processing request
///
/// Every branch-local failure is converted into one of these variants at the
/// branch boundary. Each variant maps to a fixed HTTP status, see
/// [`PhotoError::status_code`].
#[derive(Error, Debug)]
pub enum PhotoError {
    /// Missing or invalid upload, content type, or mode
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Request body exceeded the configured upload limit
    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),

    /// Upload bytes could not be decoded as an image
    #[error("Image decode failed: {0}")]
    Decode(String),

    /// Local background removal failed
    #[error("Background removal failed: {0}")]
    Processing(String),

    /// A feature was requested whose credential is not configured
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// The upstream editing service returned no image payload
    #[error("Upstream returned no image: {0}")]
    UpstreamEmpty(String),

    /// The upstream editing call failed
    #[error("Upstream image edit failed: {0}")]
    Upstream(String),

    /// Model loading or initialization errors
    #[error("Model error: {0}")]
    Model(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PhotoError {
    /// Create a new invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new payload-too-large error
    pub fn payload_too_large<S: Into<String>>(msg: S) -> Self {
        Self::PayloadTooLarge(msg.into())
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new not-configured error
    pub fn not_configured<S: Into<String>>(msg: S) -> Self {
        Self::NotConfigured(msg.into())
    }

    /// Create a new empty-upstream error
    pub fn upstream_empty<S: Into<String>>(msg: S) -> Self {
        Self::UpstreamEmpty(msg.into())
    }

    /// Create a new upstream error
    pub fn upstream<S: Into<String>>(msg: S) -> Self {
        Self::Upstream(msg.into())
    }

    /// Create a new model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create model error with troubleshooting context
    pub fn model_error_with_context<P: AsRef<std::path::Path>>(
        operation: &str,
        model_path: P,
        error: &str,
        suggestions: &[&str],
    ) -> Self {
        let path_display = model_path.as_ref().display();
        let suggestion_text = if suggestions.is_empty() {
            String::new()
        } else {
            format!(" Suggestions: {}", suggestions.join(", "))
        };

        Self::Model(format!(
            "Failed to {} model '{}': {}.{}",
            operation, path_display, error, suggestion_text
        ))
    }

    /// HTTP status code this error maps to
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) | Self::Decode(_) => 400,
            Self::PayloadTooLarge(_) => 413,
            Self::NotConfigured(_) => 501,
            Self::UpstreamEmpty(_) | Self::Upstream(_) => 502,
            Self::Processing(_) | Self::Model(_) | Self::InvalidConfig(_) | Self::Internal(_) => {
                500
            },
        }
    }

    /// Whether the failure was caused by the client's request
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}
