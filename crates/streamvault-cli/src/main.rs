//! streamvault - live stream capture supervisor
//!
//! ## Commands
//!
//! - `record`: capture a live source until it ends or Ctrl-C
//! - `process`: run the replay pipeline over an existing capture file
//! - `delete-archive`: delete an archived replay by id

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};

use streamvault_core::{
    delete_archive, init_tracing, CaptureRegistry, JsonArchiveStore, ReplayArtifact,
    ReplayPipeline, SourceIdentity, TerminalOutcome, ValidationGate, VaultConfig,
};
use streamvault_media::{FfmpegLauncher, FfprobeProber};
use streamvault_remote::{HttpAcknowledgeClient, ScpTransfer};

#[derive(Parser)]
#[command(name = "streamvault")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live stream capture supervisor and replay pipeline", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "streamvault.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a live source until the stream ends or Ctrl-C
    Record {
        /// Source identity (channel name on the ingest server)
        #[arg(short, long)]
        source: String,

        /// Capture label
        #[arg(short, long, default_value = "replay")]
        label: String,
    },

    /// Run the replay pipeline over an existing capture file
    Process {
        /// Path to the capture file
        file: PathBuf,

        /// Source identity the capture belongs to
        #[arg(short, long)]
        source: String,

        /// Capture label
        #[arg(short, long, default_value = "replay")]
        label: String,
    },

    /// Delete an archived replay by id
    DeleteArchive {
        /// Archive record id
        id: String,

        /// Path to the archive store file
        #[arg(long)]
        store: PathBuf,
    },
}

fn load_config(path: &PathBuf) -> Result<VaultConfig> {
    if path.exists() {
        VaultConfig::load(path).with_context(|| format!("loading {}", path.display()))
    } else {
        info!(config = %path.display(), "config file absent, using defaults");
        Ok(VaultConfig::default())
    }
}

fn build_pipeline(config: &VaultConfig) -> Arc<ReplayPipeline> {
    let gate = ValidationGate::new(Arc::new(FfprobeProber::new()), config.validation.clone());
    Arc::new(ReplayPipeline::new(
        gate,
        Arc::new(ScpTransfer::new(config.remote.clone())),
        Arc::new(HttpAcknowledgeClient::new(config.remote.clone())),
        config.pipeline.clone(),
        config.remote.retry_status,
    ))
}

async fn cmd_record(config: VaultConfig, source: String, label: String) -> Result<()> {
    let source = SourceIdentity::new(source);
    let pipeline = build_pipeline(&config);
    let registry = CaptureRegistry::new(
        Arc::new(FfmpegLauncher::new(config.capture.clone())),
        pipeline,
        config.capture,
    );

    let output = registry.start(&source, &label).await?;
    println!("recording {} -> {}", source, output.display());
    println!("press Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                // Explicit stop: the capture is killed and not processed.
                if registry.stop(&source, &label).await.is_err() {
                    break;
                }
            }
            _ = tokio::time::sleep(Duration::from_millis(500)) => {
                if registry.active_count().await == 0 && registry.pipeline_in_flight() == 0 {
                    break;
                }
            }
        }
    }

    info!("recorder shut down");
    Ok(())
}

async fn cmd_process(config: VaultConfig, file: PathBuf, source: String, label: String) -> Result<()> {
    let artifact = ReplayArtifact::from_capture(file, SourceIdentity::new(source), label)
        .await
        .context("reading capture file")?;
    let file_name = artifact.file_name();

    let processed = build_pipeline(&config).process(artifact).await?;
    match processed.outcome {
        TerminalOutcome::Deleted => {
            println!(
                "{file_name}: processed in {} attempt(s), local file deleted",
                processed.attempts
            );
        }
        TerminalOutcome::Quarantined { path } => {
            warn!(file = %file_name, attempts = processed.attempts, "replay quarantined");
            println!("{file_name}: quarantined at {}", path.display());
        }
    }
    Ok(())
}

async fn cmd_delete_archive(id: String, store_path: PathBuf) -> Result<()> {
    let store = JsonArchiveStore::open(&store_path)
        .with_context(|| format!("opening archive store {}", store_path.display()))?;
    let record = delete_archive(&store, &id).await?;
    println!("archive deleted: {} ({})", record.id, record.source);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.json, level);

    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Record { source, label } => cmd_record(config, source, label).await,
        Commands::Process { file, source, label } => {
            cmd_process(config, file, source, label).await
        }
        Commands::DeleteArchive { id, store } => cmd_delete_archive(id, store).await,
    }
}
