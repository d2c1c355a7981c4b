//! Collaborator trait definitions for streamvault
//!
//! These traits define the seams to external processes and services:
//! - `CaptureLauncher`: spawns the external capture process
//! - `MediaProber`: reads duration/stream metadata from a finished file
//! - `ReplayTransfer`: moves a file to the remote transcode host
//! - `AcknowledgeClient`: tells the remote service a file has arrived
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module; real implementations live in the
//! `streamvault-media` and `streamvault-remote` crates.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::domain::{ContentDigest, SourceIdentity};

// ---------------------------------------------------------------------------
// CaptureLauncher
// ---------------------------------------------------------------------------

/// Why a capture process stopped.
///
/// `Abnormal` covers both crashes and the kill delivered by an explicit
/// stop; neither produces a file trusted enough to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// The process ended on its own with a clean exit.
    Normal,

    /// The process crashed or was killed.
    Abnormal,
}

/// Opaque terminator for a running capture process.
///
/// Held by the registry while the session is active. `terminate` requests a
/// non-graceful kill; the resulting termination event still flows through
/// the watcher channel like any other.
#[derive(Debug)]
pub struct CaptureHandle {
    kill: mpsc::Sender<()>,
}

impl CaptureHandle {
    /// Build a handle from the kill channel owned by the process supervisor.
    pub fn new(kill: mpsc::Sender<()>) -> Self {
        Self { kill }
    }

    /// Request immediate termination. Idempotent; a second call after the
    /// process exited is a no-op.
    pub fn terminate(&self) {
        let _ = self.kill.try_send(());
    }
}

/// A capture process that has been spawned.
#[derive(Debug)]
pub struct LaunchedCapture {
    /// Terminator for the process.
    pub handle: CaptureHandle,

    /// Resolves exactly once when the process ends.
    pub termination: oneshot::Receiver<TerminationReason>,
}

#[derive(Error, Debug)]
#[error("capture launch failed: {0}")]
pub struct LaunchError(pub String);

/// Spawns the external capture process for a live source.
#[async_trait]
pub trait CaptureLauncher: Send + Sync {
    /// Start capturing `source` into `output`. Returns once the process is
    /// spawned; liveness is reported through the termination channel.
    async fn launch(
        &self,
        source: &SourceIdentity,
        output: &Path,
    ) -> Result<LaunchedCapture, LaunchError>;
}

// ---------------------------------------------------------------------------
// MediaProber
// ---------------------------------------------------------------------------

/// Metadata probed from a finished capture file.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    /// Container duration in seconds.
    pub duration_secs: f64,

    /// Number of video streams.
    pub video_streams: usize,

    /// Number of audio streams.
    pub audio_streams: usize,
}

#[derive(Error, Debug)]
#[error("probe failed: {0}")]
pub struct ProbeError(pub String);

/// Reads media metadata from a local file.
#[async_trait]
pub trait MediaProber: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, ProbeError>;
}

// ---------------------------------------------------------------------------
// ReplayTransfer
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
#[error("transfer failed: {0}")]
pub struct TransferError(pub String);

/// Moves a local file to the remote transcode host.
///
/// Re-transfer of the same file must be safe; the remote identifies uploads
/// by name.
#[async_trait]
pub trait ReplayTransfer: Send + Sync {
    async fn transfer(&self, local: &Path, remote_name: &str) -> Result<(), TransferError>;
}

// ---------------------------------------------------------------------------
// AcknowledgeClient
// ---------------------------------------------------------------------------

/// Request payload for the remote acknowledge endpoint.
#[derive(Debug, Clone)]
pub struct AcknowledgeRequest {
    /// File name as it exists on the remote host.
    pub file_name: String,

    /// Source the replay was captured from.
    pub source: SourceIdentity,

    /// Content hash of the transferred bytes.
    pub content_hash: ContentDigest,
}

/// Raw response from the acknowledge endpoint. Interpretation of the status
/// code happens in the pipeline, not in the client.
#[derive(Debug, Clone)]
pub struct AckResponse {
    /// HTTP-like status code.
    pub status: u16,

    /// Optional structured error body.
    pub body: Option<String>,
}

#[derive(Error, Debug)]
#[error("acknowledge transport failed: {0}")]
pub struct AckTransportError(pub String);

/// Calls the remote service's "new replay" endpoint.
#[async_trait]
pub trait AcknowledgeClient: Send + Sync {
    /// Deliver the acknowledgment. `Err` means the call itself failed at the
    /// transport level; any status code the remote produced comes back `Ok`.
    async fn acknowledge(&self, request: &AcknowledgeRequest)
        -> Result<AckResponse, AckTransportError>;
}
