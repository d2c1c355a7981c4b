//! Capture registry.
//!
//! Owns the set of in-progress recording sessions and enforces
//! at-most-one-per-key. Completed captures are handed to the replay
//! pipeline; the registry's responsibility ends at dispatch.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::collaborators::{CaptureLauncher, TerminationReason};
use crate::config::CaptureConfig;
use crate::domain::{CaptureSession, ReplayArtifact, SessionKey, SourceIdentity};
use crate::pipeline::ReplayPipeline;

#[derive(Error, Debug)]
pub enum RegistryError {
    /// A live session already exists for this key. No process was spawned.
    #[error("already recording: {0}")]
    AlreadyRecording(SessionKey),

    /// No live session exists for this key.
    #[error("not recording: {0}")]
    NotRecording(SessionKey),

    /// The external capture process could not be spawned.
    #[error("capture launch failed: {0}")]
    LaunchFailed(String),
}

/// Tracks active recording sessions and routes completed captures into the
/// pipeline.
pub struct CaptureRegistry {
    // The only mutable state shared across concurrent starts/stops.
    // Check-and-insert happens under one lock acquisition, so two
    // concurrent starts for the same key cannot both register.
    sessions: Mutex<HashMap<SessionKey, CaptureSession>>,
    launcher: Arc<dyn CaptureLauncher>,
    pipeline: Arc<ReplayPipeline>,
    config: CaptureConfig,
    // Pipeline runs dispatched but not yet terminal; lets a shutdown path
    // drain before exiting.
    in_flight: AtomicUsize,
}

impl CaptureRegistry {
    pub fn new(
        launcher: Arc<dyn CaptureLauncher>,
        pipeline: Arc<ReplayPipeline>,
        config: CaptureConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            sessions: Mutex::new(HashMap::new()),
            launcher,
            pipeline,
            config,
            in_flight: AtomicUsize::new(0),
        })
    }

    /// Start capturing `source` under `label`.
    ///
    /// Returns the output path the capture streams into. The session is
    /// registered as soon as the process is spawned, before it is confirmed
    /// running.
    pub async fn start(
        self: &Arc<Self>,
        source: &SourceIdentity,
        label: &str,
    ) -> Result<PathBuf, RegistryError> {
        let key = SessionKey::derive(source, label);

        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(&key) {
            info!(key = %key, "already being recorded");
            return Err(RegistryError::AlreadyRecording(key));
        }

        let output_path = self.output_path(source, label);
        let launched = self
            .launcher
            .launch(source, &output_path)
            .await
            .map_err(|e| RegistryError::LaunchFailed(e.to_string()))?;

        sessions.insert(
            key.clone(),
            CaptureSession {
                key: key.clone(),
                source: source.clone(),
                label: label.to_string(),
                output_path: output_path.clone(),
                handle: launched.handle,
                started_at: Utc::now(),
            },
        );
        drop(sessions);

        info!(key = %key, output = %output_path.display(), "recording started");

        let registry = Arc::clone(self);
        let termination = launched.termination;
        tokio::spawn(async move {
            // A dropped sender means the supervisor died with the process.
            let reason = termination.await.unwrap_or(TerminationReason::Abnormal);
            registry.on_capture_terminated(&key, reason).await;
        });

        Ok(output_path)
    }

    /// Forcibly terminate the capture for `source` + `label`.
    ///
    /// Deregistration is performed by the termination callback, not here;
    /// mutating the map in both places would race the process's own
    /// asynchronous termination event.
    pub async fn stop(&self, source: &SourceIdentity, label: &str) -> Result<(), RegistryError> {
        let key = SessionKey::derive(source, label);
        let sessions = self.sessions.lock().await;
        let session = sessions
            .get(&key)
            .ok_or_else(|| RegistryError::NotRecording(key.clone()))?;

        session.handle.terminate();
        info!(key = %key, "stopping recording");
        Ok(())
    }

    /// Number of live sessions.
    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Number of dispatched pipeline runs that have not reached a terminal
    /// outcome yet.
    pub fn pipeline_in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Termination callback invoked by the watcher task.
    ///
    /// Normal termination hands the produced file to the pipeline,
    /// fire-and-forget. Abnormal termination (crash or explicit stop) only
    /// deregisters; a killed capture is not assumed well-formed enough to
    /// process.
    async fn on_capture_terminated(self: &Arc<Self>, key: &SessionKey, reason: TerminationReason) {
        let session = self.sessions.lock().await.remove(key);
        let Some(session) = session else {
            // Already deregistered; nothing to do.
            return;
        };

        match reason {
            TerminationReason::Normal => {
                info!(key = %key, "recording ended");
                match ReplayArtifact::from_capture(
                    session.output_path,
                    session.source,
                    session.label,
                )
                .await
                {
                    Ok(artifact) => {
                        let pipeline = Arc::clone(&self.pipeline);
                        let registry = Arc::clone(self);
                        self.in_flight.fetch_add(1, Ordering::SeqCst);
                        tokio::spawn(async move {
                            if let Err(e) = pipeline.process(artifact).await {
                                error!(error = %e, "replay processing aborted");
                            }
                            registry.in_flight.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                    Err(e) => {
                        error!(key = %key, error = %e, "capture file unreadable, not processing");
                    }
                }
            }
            TerminationReason::Abnormal => {
                warn!(key = %key, "recording ended abnormally, not processing");
            }
        }
    }

    fn output_path(&self, source: &SourceIdentity, label: &str) -> PathBuf {
        // Creation timestamp keeps repeated captures of one key from
        // colliding on disk.
        let ts = Utc::now().timestamp_millis();
        self.config
            .recordings_dir
            .join(format!("{}_{}_{}.flv", source, label, ts))
    }
}
