//! Solstice CLI
//!
//! Thin wrappers over the core APIs: ingest PDFs, serve the gateway, run
//! fact-checking studies, clear caches. Exit code 0 on success, 1 on any
//! I/O or validation failure.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use solstice_gateway::{GatewayConfig, RetryPolicy};
use solstice_ingest::{
    ingest, DetectorConfig, IngestConfig, LabelMap, OnnxLayoutDetector,
};
use solstice_layout::ResolverConfig;
use solstice_study::{persist_study, run_study, EvaluatorConfig, HttpGatewayClient, StudyConfig};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "solstice")]
#[command(about = "PDF ingestion and LLM fact-checking pipeline")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a clinical/scientific PDF into the document cache
    Ingest {
        /// Path to the PDF file
        pdf: PathBuf,

        /// Cache root directory
        #[arg(long, default_value = "cache/documents")]
        cache_dir: PathBuf,

        /// Path to the ONNX layout model
        #[arg(long, default_value = "models/layout_detector.onnx")]
        model: PathBuf,

        /// Detection DPI
        #[arg(long, default_value = "400")]
        dpi: u32,

        /// Box expansion padding in pixels
        #[arg(long, default_value = "5.0")]
        padding: f32,

        /// Resolver preset (clinical, marketing, conservative, aggressive)
        #[arg(long, default_value = "clinical")]
        preset: String,

        /// Save raw-layout visualizations
        #[arg(long)]
        visualize: bool,
    },

    /// Ingest a marketing PDF (marketing label map, hybrid reading order)
    IngestMarketing {
        /// Path to the PDF file
        pdf: PathBuf,

        /// Cache root directory
        #[arg(long, default_value = "cache/documents")]
        cache_dir: PathBuf,

        /// Path to the ONNX layout model
        #[arg(long, default_value = "models/layout_detector.onnx")]
        model: PathBuf,

        /// Save raw-layout visualizations
        #[arg(long)]
        visualize: bool,
    },

    /// Run a fact-checking study over ingested documents
    RunStudy {
        /// Claims JSON file
        #[arg(long)]
        claims: PathBuf,

        /// Document IDs to evaluate against (default: all ingested)
        #[arg(long)]
        documents: Vec<String>,

        /// Cache root the documents were ingested into
        #[arg(long, default_value = "cache/documents")]
        cache_dir: PathBuf,

        /// Output directory for study artifacts
        #[arg(long, default_value = "studies")]
        output_dir: PathBuf,

        /// Gateway base URL
        #[arg(long, default_value = "http://127.0.0.1:8106")]
        gateway_url: String,

        /// Maximum concurrently evaluating claims
        #[arg(long, default_value = "3")]
        max_concurrent: usize,

        /// Model to request from the gateway
        #[arg(long, default_value = "gpt-4o")]
        model: String,

        /// Study name used in artifacts
        #[arg(long, default_value = "study")]
        name: String,
    },

    /// Serve the LLM gateway
    Gateway {
        /// Bind host (overrides SOLSTICE_GATEWAY_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides SOLSTICE_GATEWAY_PORT)
        #[arg(long)]
        port: Option<u16>,

        /// Disable the response cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Remove every cached document and response
    ClearAllCache {
        /// Document cache root
        #[arg(long, default_value = "cache/documents")]
        cache_dir: PathBuf,

        /// LLM response cache directory
        #[arg(long, default_value = "cache/llm_responses")]
        response_cache_dir: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("SOLSTICE_LOG_LEVEL", "info"),
    )
    .init();

    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Ingest {
            pdf,
            cache_dir,
            model,
            dpi,
            padding,
            preset,
            visualize,
        } => {
            let mut config = IngestConfig::clinical(cache_dir);
            config.detection_dpi = dpi;
            config.box_padding = padding;
            config.resolver = ResolverConfig::preset(&preset).map_err(anyhow::Error::msg)?;
            config.save_visualizations = visualize;
            run_ingest(&pdf, &model, LabelMap::Academic, config)
        }

        Command::IngestMarketing {
            pdf,
            cache_dir,
            model,
            visualize,
        } => {
            let mut config = IngestConfig::marketing(cache_dir);
            config.save_visualizations = visualize;
            run_ingest(&pdf, &model, LabelMap::Marketing, config)
        }

        Command::RunStudy {
            claims,
            documents,
            cache_dir,
            output_dir,
            gateway_url,
            max_concurrent,
            model,
            name,
        } => {
            init_tracing();
            let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
            runtime.block_on(async {
                let document_ids = if documents.is_empty() {
                    solstice_core::list_ingested(&cache_dir)
                } else {
                    documents
                };
                anyhow::ensure!(!document_ids.is_empty(), "no ingested documents to evaluate");

                let mut config = StudyConfig::new(name, cache_dir, output_dir.clone());
                config.max_concurrent_claims = max_concurrent;
                config.evaluator = EvaluatorConfig {
                    model,
                    ..EvaluatorConfig::default()
                };

                let client = Arc::new(HttpGatewayClient::new(gateway_url));
                let result = run_study(&claims, &document_ids, client, &config).await?;
                let path = persist_study(&result, &output_dir)?;
                println!(
                    "study complete: {}/{} pairs successful, results at {}",
                    result.summary.successful_pairs,
                    result.summary.total_pairs,
                    path.display()
                );
                Ok(())
            })
        }

        Command::Gateway { host, port, no_cache } => {
            init_tracing();
            let mut config = GatewayConfig::from_env();
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if no_cache {
                config.cache_dir = None;
            }
            config.retry = RetryPolicy::default();

            let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
            runtime
                .block_on(solstice_gateway::serve(config))
                .context("gateway failed")
        }

        Command::ClearAllCache {
            cache_dir,
            response_cache_dir,
        } => {
            solstice_core::clear_all(&cache_dir).context("failed to clear document cache")?;
            solstice_core::clear_all(&response_cache_dir)
                .context("failed to clear response cache")?;
            println!("caches cleared");
            Ok(())
        }
    }
}

/// Run one ingestion with the ONNX detector.
fn run_ingest(
    pdf: &std::path::Path,
    model: &std::path::Path,
    label_map: LabelMap,
    config: IngestConfig,
) -> Result<()> {
    anyhow::ensure!(pdf.is_file(), "PDF not found: {}", pdf.display());

    let detector_config = DetectorConfig {
        label_map,
        ..DetectorConfig::new(model.to_path_buf())
    };
    let detector = OnnxLayoutDetector::load(detector_config)
        .with_context(|| format!("failed to load layout model {}", model.display()))?;

    let document = ingest(pdf, &detector, &config)
        .with_context(|| format!("ingestion failed for {}", pdf.display()))?;

    println!(
        "ingested {} pages, {} blocks ({} raw detections)",
        document.metadata.total_pages,
        document.pipeline_metadata.final_block_count,
        document.pipeline_metadata.raw_detection_count
    );
    Ok(())
}

/// Tracing subscriber for the async subcommands, honoring
/// `SOLSTICE_LOG_LEVEL`.
fn init_tracing() {
    let filter = std::env::var("SOLSTICE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(filter)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
