//! Configuration for streamvault components.
//!
//! Loaded from a TOML file; every section has defaults matching the
//! reference deployment so a minimal config only needs the remote host.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Capture process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CaptureConfig {
    /// Directory finished captures are written to.
    pub recordings_dir: PathBuf,

    /// Input URL template; `{source}` is replaced with the source identity.
    pub input_url_template: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            recordings_dir: PathBuf::from("/archives/rec"),
            input_url_template: "rtmp://ingest/live/{source}".to_string(),
        }
    }
}

/// Retry loop and quarantine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PipelineConfig {
    /// Maximum complete pipeline attempts per artifact.
    pub max_attempts: u32,

    /// Directory exhausted artifacts are moved into.
    pub quarantine_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            quarantine_dir: PathBuf::from("/archives/quarantine"),
        }
    }
}

/// Validation gate bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ValidationConfig {
    /// Reject files smaller than this (empty or corrupt captures).
    pub min_file_bytes: u64,

    /// Reject files larger than this (too large to process economically).
    pub max_file_bytes: u64,

    /// Reject replays shorter than this many seconds.
    pub min_duration_secs: f64,

    /// Reject replays longer than this many seconds.
    pub max_duration_secs: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_file_bytes: 10 * MIB,
            max_file_bytes: 6 * GIB,
            min_duration_secs: 30.0,
            max_duration_secs: 6.0 * 3600.0,
        }
    }
}

/// Remote transcode host settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RemoteConfig {
    /// Transfer host.
    pub host: String,

    /// Transfer port.
    pub port: u16,

    /// Transfer user.
    pub user: String,

    /// Path to the pre-provisioned private key.
    pub identity_file: PathBuf,

    /// Directory on the remote host uploads land in.
    pub remote_dir: String,

    /// Full URL of the "new replay" acknowledge endpoint.
    pub acknowledge_url: String,

    /// Status code the remote uses for "not yet ready, retry later".
    pub retry_status: u16,

    /// Shared secret sent with acknowledgments.
    pub shared_secret: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: "transcoder.example.com".to_string(),
            port: 22,
            user: "replay".to_string(),
            identity_file: PathBuf::from("/creds/ssh-key"),
            remote_dir: "videos_to_transcode".to_string(),
            acknowledge_url: "https://transcoder.example.com/stream".to_string(),
            retry_status: 425,
            shared_secret: String::new(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct VaultConfig {
    pub capture: CaptureConfig,
    pub pipeline: PipelineConfig,
    pub validation: ValidationConfig,
    pub remote: RemoteConfig,
}

impl VaultConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
