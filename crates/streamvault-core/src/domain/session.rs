//! Session identity types.
//!
//! A capture is keyed by source identity plus a capture label. The key is
//! case-insensitive so that `Channel/live` and `channel/LIVE` cannot record
//! concurrently.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collaborators::CaptureHandle;

/// Identity of a live source (e.g. a channel name on the ingest server).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceIdentity(String);

impl SourceIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        SourceIdentity(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SourceIdentity {
    fn from(s: &str) -> Self {
        SourceIdentity(s.to_string())
    }
}

/// Deterministic, case-insensitive identifier for one recording session.
///
/// The inner field is private to guarantee the string is always the
/// lowercased `"{source}-{label}"` form produced by [`SessionKey::derive`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey(String);

impl SessionKey {
    /// Derive the key for a source + label pair.
    pub fn derive(source: &SourceIdentity, label: &str) -> Self {
        SessionKey(format!("{}-{}", source.as_str(), label).to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One active recording session.
///
/// Owned exclusively by the registry for its lifetime; the handle is the
/// only way to reach the external capture process.
#[derive(Debug)]
pub struct CaptureSession {
    pub key: SessionKey,
    pub source: SourceIdentity,
    pub label: String,
    pub output_path: PathBuf,
    pub handle: CaptureHandle,
    pub started_at: DateTime<Utc>,
}
