//! FEP front-end processor host binary: loads configuration, initializes
//! tracing, and wires `fep-conn`'s connection manager to the transaction
//! pipeline (§2 "System overview").

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use fep_conn::ConnectionManager;
use fep_gateway::cipher;
use fep_gateway::config::GatewayConfig;
use fep_gateway::handler::PipelineHandler;
use fep_gateway::schema;
use fep_pipeline::{BatchDriver, Pipeline, ReversalService};
use fep_repo::InMemoryRepository;
use fep_validate::ValidationEngine;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fep-gateway")]
#[command(about = "FEP front-end processor: terminates bank-card network traffic and mediates with core banking")]
struct Args {
    /// Path to the gateway's TOML configuration document.
    #[arg(long, default_value = "fep-gateway.toml")]
    config: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = GatewayConfig::load(&args.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Two logical worker pools sharing one multi-threaded runtime (§5
    // "handler worker pool and I/O worker pool ... two tokio::runtime::Handles
    // from a single runtime"): the same `Handle` drives both socket I/O
    // (fep-net) and pipeline stage execution (fep-pipeline), since neither
    // workload benefits from physical isolation on a single host.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.runtime.worker_threads)
        .enable_all()
        .build()?;

    runtime.block_on(run(config))
}

async fn run(config: GatewayConfig) -> anyhow::Result<()> {
    tracing::info!(channels = config.channels.len(), "starting fep-gateway");

    let repository: Arc<dyn fep_repo::Repository> = match config.repository.backend.as_str() {
        "memory" => Arc::new(InMemoryRepository::new()),
        other => anyhow::bail!("unknown repository backend '{other}'"),
    };

    let validation = match &config.validation.rules_path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("reading validation rules {path}: {e}"))?;
            fep_validate::load_engine(&text).map_err(|e| anyhow::anyhow!("parsing validation rules {path}: {e}"))?
        }
        None => ValidationEngine::default(),
    };

    let router = Arc::new(fep_pipeline::Router::new(fep_pipeline::default_processors()));
    let pipeline = Arc::new(Pipeline::new(
        repository.clone(),
        Arc::new(validation),
        router,
        Arc::new(fep_pipeline::TracingAuditLogger),
        Arc::new(cipher::XorPanCipher::from_env()),
        config.repository.dedup_window_minutes,
    ));

    let _reversal_service = ReversalService::new(repository.clone(), pipeline.clone());
    let _batch_driver = BatchDriver::new(pipeline.clone(), config.runtime.batch_concurrency);

    let handler = Arc::new(PipelineHandler::new(pipeline));
    let schema_provider = Arc::new(fep_conn::FixedSchema(Arc::new(schema::default_iso8583_schema())));
    let manager = ConnectionManager::new(handler, schema_provider);

    for channel in config.channels {
        let channel_id = channel.channel_id.clone();
        if let Err(e) = manager.add(channel).await {
            tracing::error!(channel_id, error = %e, "failed to bring up channel");
        }
    }

    tracing::info!("fep-gateway ready");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    for channel_id in manager.all_ids() {
        manager.remove(&channel_id).await;
    }

    Ok(())
}
