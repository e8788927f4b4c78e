//! Conversion from CLI arguments to `ServerConfig`

use crate::cli::main_impl::Cli;
use crate::config::ServerConfig;
use anyhow::{Context, Result};

/// Name of the environment variable holding the image API credential
pub(crate) const API_KEY_ENV: &str = "OPENAI_API_KEY";

pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build a validated `ServerConfig`
    ///
    /// The API key is passed separately; it has no command-line flag so it
    /// never shows up in process listings.
    pub(crate) fn from_cli(cli: &Cli, api_key: Option<String>) -> Result<ServerConfig> {
        ServerConfig::builder()
            .host(cli.host)
            .port(cli.port)
            .max_upload_bytes(cli.max_upload_bytes)
            .model_path(&cli.model)
            .execution_provider(cli.execution_provider)
            .intra_threads(cli.threads)
            .api_key(api_key)
            .openai_base_url(cli.openai_base_url.as_str())
            .openai_model(cli.openai_model.clone())
            .build()
            .context("Invalid configuration")
    }

    /// Read the API key from the process environment
    pub(crate) fn api_key_from_env() -> Option<String> {
        std::env::var(API_KEY_ENV).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExecutionProvider, DEFAULT_OPENAI_BASE_URL, DEFAULT_PORT};
    use clap::Parser;
    use std::path::Path;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["photo-process"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_flags_map_to_config() {
        let cli = parse(&[
            "--port",
            "8080",
            "--host",
            "127.0.0.1",
            "--model",
            "/srv/u2net.onnx",
            "--execution-provider",
            "CPU",
            "--threads",
            "2",
            "--openai-base-url",
            "http://localhost:9000/v1/",
            "--openai-model",
            "gpt-image-1",
        ]);
        let config = CliConfigBuilder::from_cli(&cli, Some("sk-test".to_string())).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.host.to_string(), "127.0.0.1");
        assert_eq!(config.segmentation.model_path, Path::new("/srv/u2net.onnx"));
        assert_eq!(config.segmentation.execution_provider, ExecutionProvider::Cpu);
        assert_eq!(config.segmentation.intra_threads, 2);
        assert_eq!(config.enhancement.base_url, "http://localhost:9000/v1");
        assert_eq!(config.enhancement.model.as_deref(), Some("gpt-image-1"));
        assert!(config.enhancement.is_configured());
    }

    #[test]
    fn test_defaults_without_flags() {
        let cli = Cli::try_parse_from(["photo-process"]).unwrap();
        // Environment may override defaults on a developer machine
        if std::env::var_os("PORT").is_none() {
            assert_eq!(cli.port, DEFAULT_PORT);
        }
        if std::env::var_os("OPENAI_BASE_URL").is_none() {
            assert_eq!(cli.openai_base_url, DEFAULT_OPENAI_BASE_URL);
        }
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Cli::try_parse_from(["photo-process", "--execution-provider", "tpu"]).is_err());
        assert!(Cli::try_parse_from(["photo-process", "--port", "not-a-port"]).is_err());

        let cli = parse(&["--port", "0"]);
        assert!(CliConfigBuilder::from_cli(&cli, None).is_err());
    }

    #[test]
    fn test_missing_key_disables_profile() {
        let cli = parse(&[]);
        let config = CliConfigBuilder::from_cli(&cli, None).unwrap();
        assert!(!config.enhancement.is_configured());
    }
}
