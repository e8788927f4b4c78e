//! Tracing subscriber configuration
//!
//! The server binary installs the subscriber; library code only emits events
//! and spans.

#[cfg(feature = "cli")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable output with ANSI colors
    Console,
    /// Plain compact output for log collectors without color support
    Compact,
    /// JSON structured logging
    #[cfg(feature = "tracing-json")]
    Json,
}

impl std::str::FromStr for TracingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "console" | "pretty" => Ok(Self::Console),
            "compact" | "plain" => Ok(Self::Compact),
            #[cfg(feature = "tracing-json")]
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Tracing configuration builder
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Verbosity level from repeated `-v` flags
    pub verbosity: u8,
    pub format: TracingFormat,
    /// Filter directives; overrides verbosity when set (usually from `RUST_LOG`)
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            format: TracingFormat::Console,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Set filter directives, ignoring blank strings
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        let filter = filter.into();
        if !filter.trim().is_empty() {
            self.env_filter = Some(filter);
        }
        self
    }

    /// Convert verbosity level to a filter string
    ///
    /// The default keeps dependency chatter (hyper, ort) at `warn`.
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "info,hyper=warn,ort=warn",
            1 => "debug,hyper=info,ort=info",
            _ => "trace",
        }
    }

    /// The filter directives that `init` will install
    pub fn effective_filter(&self) -> &str {
        self.env_filter
            .as_deref()
            .unwrap_or_else(|| self.verbosity_to_filter())
    }

    /// Install the global subscriber
    ///
    /// # Errors
    /// Fails on malformed filter directives or when a global subscriber is
    /// already installed
    #[cfg(feature = "cli")]
    pub fn init(self) -> anyhow::Result<()> {
        use tracing_subscriber::fmt;

        let filter = EnvFilter::try_new(self.effective_filter())?;
        let registry = Registry::default().with(filter);

        match self.format {
            TracingFormat::Console => {
                let fmt_layer = fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_level(true)
                    .compact();
                registry.with(fmt_layer).try_init()?;
            },
            TracingFormat::Compact => {
                let fmt_layer = fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .compact();
                registry.with(fmt_layer).try_init()?;
            },
            #[cfg(feature = "tracing-json")]
            TracingFormat::Json => {
                let fmt_layer = fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true);
                registry.with(fmt_layer).try_init()?;
            },
        }

        Ok(())
    }
}

/// Span helpers shared by the server and the model loader
pub mod spans {
    use tracing::{Level, Span};

    /// One span per HTTP request
    pub fn request(request_id: &str, route: &str) -> Span {
        tracing::span!(
            Level::INFO,
            "request",
            request_id = %request_id,
            route = %route,
            mode = tracing::field::Empty
        )
    }

    pub fn model_loading(model_path: &std::path::Path, provider: &str) -> Span {
        tracing::span!(
            Level::INFO,
            "model_loading",
            model_path = %model_path.display(),
            provider = %provider
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_mapping() {
        let filter = |v| TracingConfig::new().with_verbosity(v).verbosity_to_filter();
        assert!(filter(0).starts_with("info"));
        assert!(filter(1).starts_with("debug"));
        assert_eq!(filter(2), "trace");
        assert_eq!(filter(9), "trace");
    }

    #[test]
    fn test_env_filter_overrides_verbosity() {
        let config = TracingConfig::new()
            .with_verbosity(2)
            .with_env_filter("photo_process=debug");
        assert_eq!(config.effective_filter(), "photo_process=debug");

        let blank = TracingConfig::new().with_env_filter("  ");
        assert!(blank.env_filter.is_none());
        assert!(blank.effective_filter().starts_with("info"));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("console".parse::<TracingFormat>().unwrap(), TracingFormat::Console);
        assert_eq!("Compact".parse::<TracingFormat>().unwrap(), TracingFormat::Compact);
        assert!("xml".parse::<TracingFormat>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.verbosity, 0);
        assert_eq!(config.format, TracingFormat::Console);
        assert!(config.env_filter.is_none());
    }
}
