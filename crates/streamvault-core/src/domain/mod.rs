//! Domain types for capture sessions and replay artifacts.

pub mod artifact;
pub mod digest;
pub mod outcome;
pub mod session;

pub use artifact::ReplayArtifact;
pub use digest::ContentDigest;
pub use outcome::{AckDisposition, AttemptOutcome, TerminalOutcome};
pub use session::{CaptureSession, SessionKey, SourceIdentity};
