//! Replay processing pipeline.
//!
//! Drives one completed capture through validate → transfer → acknowledge →
//! cleanup with bounded retry. Every retry re-runs the whole pipeline from
//! validation against the same still-present local file; each attempt is a
//! complete, idempotent re-run.
//!
//! The local file is deleted only after a confirmed acknowledgment. Every
//! other terminal path moves it into the quarantine directory; no code path
//! leaves an artifact in an ambiguous location.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::collaborators::{
    AcknowledgeClient, AcknowledgeRequest, AckTransportError, ReplayTransfer,
};
use crate::config::PipelineConfig;
use crate::domain::{AckDisposition, AttemptOutcome, ReplayArtifact, TerminalOutcome};
use crate::validation::{ValidationGate, ValidationRejection};

/// Failures that abort the retry loop itself.
///
/// A transport-level acknowledge failure is escalated rather than retried: a
/// partially-ingested transfer must not be retried blindly without operator
/// visibility. The artifact is still quarantined before the error surfaces.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    AcknowledgeTransport(#[from] AckTransportError),

    #[error("filesystem operation failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Terminal record of one processed artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedReplay {
    pub outcome: TerminalOutcome,
    pub attempts: u32,
}

/// Orchestrates validation, transfer, acknowledgment, and cleanup.
pub struct ReplayPipeline {
    gate: ValidationGate,
    transfer: Arc<dyn ReplayTransfer>,
    acknowledge: Arc<dyn AcknowledgeClient>,
    config: PipelineConfig,
    retry_status: u16,
}

impl ReplayPipeline {
    pub fn new(
        gate: ValidationGate,
        transfer: Arc<dyn ReplayTransfer>,
        acknowledge: Arc<dyn AcknowledgeClient>,
        config: PipelineConfig,
        retry_status: u16,
    ) -> Self {
        Self {
            gate,
            transfer,
            acknowledge,
            config,
            retry_status,
        }
    }

    /// Process one completed capture to a terminal outcome.
    ///
    /// Stages execute strictly in order; deletion is provably last. The loop
    /// consumes one attempt per retryable failure up to
    /// `PipelineConfig::max_attempts`, then quarantines.
    pub async fn process(
        &self,
        mut artifact: ReplayArtifact,
    ) -> Result<ProcessedReplay, PipelineError> {
        let file_name = artifact.file_name();
        info!(file = %file_name, source = %artifact.source, "processing replay");

        loop {
            artifact.attempts += 1;

            match self.run_once(&mut artifact).await {
                Ok(AttemptOutcome::Succeeded) => {
                    tokio::fs::remove_file(&artifact.file_path).await?;
                    info!(
                        file = %file_name,
                        attempts = artifact.attempts,
                        "replay processed, local file deleted"
                    );
                    return Ok(ProcessedReplay {
                        outcome: TerminalOutcome::Deleted,
                        attempts: artifact.attempts,
                    });
                }
                Ok(AttemptOutcome::Fatal(reason)) => {
                    warn!(
                        file = %file_name,
                        attempt = artifact.attempts,
                        reason = %reason,
                        "fatal failure, quarantining"
                    );
                    break;
                }
                Ok(AttemptOutcome::Retryable(reason)) => {
                    warn!(
                        file = %file_name,
                        attempt = artifact.attempts,
                        max_attempts = self.config.max_attempts,
                        reason = %reason,
                        "attempt failed"
                    );
                    if artifact.attempts >= self.config.max_attempts {
                        break;
                    }
                }
                Err(transport) => {
                    error!(
                        file = %file_name,
                        attempt = artifact.attempts,
                        error = %transport,
                        "acknowledge transport failure, aborting retries"
                    );
                    // The transport failure is the root cause; a quarantine
                    // failure on top of it must not displace it.
                    if let Err(e) = self.quarantine(&artifact).await {
                        error!(
                            file = %file_name,
                            error = %e,
                            "quarantine failed after transport failure"
                        );
                    }
                    return Err(PipelineError::AcknowledgeTransport(transport));
                }
            }
        }

        let quarantined = self.quarantine(&artifact).await?;
        Ok(ProcessedReplay {
            outcome: quarantined,
            attempts: artifact.attempts,
        })
    }

    /// One complete attempt: validate, transfer, acknowledge.
    ///
    /// `Err` is reserved for the escalated acknowledge transport failure;
    /// everything else folds into the tagged [`AttemptOutcome`].
    async fn run_once(
        &self,
        artifact: &mut ReplayArtifact,
    ) -> Result<AttemptOutcome, AckTransportError> {
        let info = match self.gate.validate(artifact).await {
            Ok(info) => info,
            Err(ValidationRejection::Permanent(reason)) => {
                return Ok(AttemptOutcome::Fatal(reason))
            }
            Err(ValidationRejection::Transient(reason)) => {
                return Ok(AttemptOutcome::Retryable(reason))
            }
        };
        artifact.duration_secs = Some(info.duration_secs);

        let remote_name = artifact.file_name();
        if let Err(e) = self.transfer.transfer(&artifact.file_path, &remote_name).await {
            return Ok(AttemptOutcome::Retryable(e.to_string()));
        }

        let content_hash = match artifact.ensure_content_hash().await {
            Ok(hash) => hash.clone(),
            Err(e) => return Ok(AttemptOutcome::Retryable(e.to_string())),
        };

        let request = AcknowledgeRequest {
            file_name: remote_name,
            source: artifact.source.clone(),
            content_hash,
        };
        let response = self.acknowledge.acknowledge(&request).await?;

        match AckDisposition::classify(response.status, self.retry_status) {
            AckDisposition::Success => Ok(AttemptOutcome::Succeeded),
            AckDisposition::RetryLater => Ok(AttemptOutcome::Retryable(format!(
                "remote not ready, status {}",
                response.status
            ))),
            AckDisposition::Rejected => Ok(AttemptOutcome::Fatal(format!(
                "remote rejected acknowledgment, status {}: {}",
                response.status,
                response.body.as_deref().unwrap_or("")
            ))),
        }
    }

    /// Move the artifact into the quarantine directory under its original
    /// file name. A move, never a delete.
    async fn quarantine(&self, artifact: &ReplayArtifact) -> Result<TerminalOutcome, PipelineError> {
        tokio::fs::create_dir_all(&self.config.quarantine_dir).await?;
        let dest = self.config.quarantine_dir.join(artifact.file_name());

        if let Err(rename_err) = tokio::fs::rename(&artifact.file_path, &dest).await {
            // Quarantine may live on another filesystem; fall back to copy.
            copy_then_remove(&artifact.file_path, &dest)
                .await
                .map_err(|_| rename_err)?;
        }

        warn!(
            file = %artifact.file_path.display(),
            quarantine = %dest.display(),
            attempts = artifact.attempts,
            "artifact quarantined for manual inspection"
        );
        Ok(TerminalOutcome::Quarantined { path: dest })
    }
}

async fn copy_then_remove(src: &Path, dest: &PathBuf) -> std::io::Result<()> {
    tokio::fs::copy(src, dest).await?;
    tokio::fs::remove_file(src).await
}
