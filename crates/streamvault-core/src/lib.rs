//! streamvault core library
//!
//! Re-exports the capture registry, replay pipeline, and the collaborator
//! seams they depend on.

pub mod archive;
pub mod collaborators;
pub mod config;
pub mod domain;
pub mod fakes;
pub mod pipeline;
pub mod registry;
pub mod telemetry;
pub mod validation;

pub use archive::{delete_archive, ArchiveError, ArchiveRecord, ArchiveStore, JsonArchiveStore};
pub use collaborators::{
    AckResponse, AcknowledgeClient, AcknowledgeRequest, AckTransportError, CaptureHandle,
    CaptureLauncher, LaunchError, LaunchedCapture, MediaInfo, MediaProber, ProbeError,
    ReplayTransfer, TerminationReason, TransferError,
};
pub use config::{
    CaptureConfig, ConfigError, PipelineConfig, RemoteConfig, ValidationConfig, VaultConfig,
};
pub use domain::{
    AckDisposition, AttemptOutcome, CaptureSession, ContentDigest, ReplayArtifact, SessionKey,
    SourceIdentity, TerminalOutcome,
};
pub use pipeline::{PipelineError, ProcessedReplay, ReplayPipeline};
pub use registry::{CaptureRegistry, RegistryError};
pub use telemetry::init_tracing;
pub use validation::{ValidationGate, ValidationRejection};

/// streamvault version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
