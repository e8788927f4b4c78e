//! Photo processing HTTP server
//!
//! Loads the segmentation model once, then serves `/process-photo` and
//! `/health` until interrupted.

use super::config::CliConfigBuilder;
use crate::{
    api::{build_router, AppState},
    backends::OnnxBackend,
    config::{
        ExecutionProvider, ServerConfig, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_MODEL_PATH,
        DEFAULT_OPENAI_BASE_URL, DEFAULT_PORT,
    },
    enhancement::ProfileEnhancer,
    pipeline::PhotoPipeline,
    segmentation::ModelSegmenter,
    tracing_config::{spans, TracingConfig, TracingFormat},
};
use anyhow::{Context, Result};
use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Photo processing server: ID-photo background removal and profile enhancement
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "photo-process")]
pub struct Cli {
    /// Bind address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Listening port
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Path to the U²-Net ONNX model
    #[arg(short, long, env = "MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    pub model: PathBuf,

    /// Execution provider (auto, cpu, cuda, coreml)
    #[arg(short, long, env = "EXECUTION_PROVIDER", default_value = "auto")]
    pub execution_provider: ExecutionProvider,

    /// Number of inference threads (0 = auto-detect)
    #[arg(short, long, env = "INFERENCE_THREADS", default_value_t = 0)]
    pub threads: usize,

    /// Maximum request body size in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// Base URL of the image editing API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_OPENAI_BASE_URL)]
    pub openai_base_url: String,

    /// Model name forwarded to the image editing API
    #[arg(long, env = "OPENAI_IMAGE_MODEL")]
    pub openai_model: Option<String>,

    /// Log output format (console, compact, json)
    #[arg(long, env = "LOG_FORMAT", default_value = "console")]
    pub log_format: TracingFormat,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE); ignored when RUST_LOG is set
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Show execution provider availability and exit
    #[arg(long)]
    pub show_providers: bool,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli).context("Failed to initialize tracing")?;

    if cli.show_providers {
        show_provider_diagnostics();
        return Ok(());
    }

    let config = CliConfigBuilder::from_cli(&cli, CliConfigBuilder::api_key_from_env())?;
    info!(
        addr = %config.socket_addr(),
        model = %config.segmentation.model_path.display(),
        provider = %config.segmentation.execution_provider,
        "Starting photo processing server"
    );

    let pipeline = build_pipeline(&config).map_err(|e| {
        error!(error = %format!("{e:#}"), "Startup failed");
        e
    })?;
    if !pipeline.profile_enabled() {
        warn!(
            "OPENAI_API_KEY is not set; profile mode requests will be answered with 501"
        );
    }

    let app = build_router(AppState::new(Arc::new(pipeline), config.max_upload_bytes));

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Load the model and wire both processing branches
fn build_pipeline(config: &ServerConfig) -> Result<PhotoPipeline> {
    let provider = config.segmentation.execution_provider.to_string();
    let backend = {
        let _span = spans::model_loading(&config.segmentation.model_path, &provider).entered();
        OnnxBackend::load(&config.segmentation).context("Failed to load segmentation model")?
    };
    info!(
        model = %backend.model_path().display(),
        load_ms = backend.load_time().as_millis() as u64,
        "Segmentation model ready"
    );

    let segmenter = ModelSegmenter::new(backend, &config.segmentation);
    let enhancer = ProfileEnhancer::from_config(config.enhancement.clone());

    Ok(PhotoPipeline::new(Arc::new(segmenter), enhancer))
}

fn init_tracing(cli: &Cli) -> Result<()> {
    let mut config = TracingConfig::new()
        .with_verbosity(cli.verbose)
        .with_format(cli.log_format);
    if let Ok(filter) = std::env::var("RUST_LOG") {
        config = config.with_env_filter(filter);
    }
    config.init()
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        },
    }
}

fn show_provider_diagnostics() {
    let cpu_count = std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1);
    println!("System: {cpu_count} CPU cores detected");

    println!("\nExecution providers:");
    for (name, available) in OnnxBackend::list_providers() {
        let status = if available { "available" } else { "not available" };
        println!("  {name}: {status}");
    }

    println!("\nSelect one with --execution-provider or EXECUTION_PROVIDER (auto, cpu, cuda, coreml).");
}
