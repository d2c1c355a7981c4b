//! Validation gate for finished captures.
//!
//! Runs before any transfer so that artifacts which can never succeed do not
//! spend network or remote-processing resources. Size and duration
//! violations are permanent; a probe call failure is transient.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::collaborators::{MediaInfo, MediaProber};
use crate::config::ValidationConfig;
use crate::domain::ReplayArtifact;

/// Why an artifact was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationRejection {
    /// Size or duration bound violated; retrying cannot change the file.
    #[error("validation rejected (permanent): {0}")]
    Permanent(String),

    /// The probe call itself failed; a retry may succeed.
    #[error("validation rejected (transient): {0}")]
    Transient(String),
}

/// Inspects a finished capture and decides whether it is eligible for
/// processing. Checks short-circuit on first failure.
pub struct ValidationGate {
    prober: Arc<dyn MediaProber>,
    config: ValidationConfig,
}

impl ValidationGate {
    pub fn new(prober: Arc<dyn MediaProber>, config: ValidationConfig) -> Self {
        Self { prober, config }
    }

    /// Validate size bounds, then probe and validate duration bounds.
    ///
    /// Returns the probed metadata on acceptance so the caller can populate
    /// the artifact without probing twice.
    pub async fn validate(
        &self,
        artifact: &ReplayArtifact,
    ) -> Result<MediaInfo, ValidationRejection> {
        let size = artifact.file_size_bytes;
        if size < self.config.min_file_bytes {
            return Err(ValidationRejection::Permanent(format!(
                "file too small: {} bytes < {} minimum",
                size, self.config.min_file_bytes
            )));
        }
        if size > self.config.max_file_bytes {
            return Err(ValidationRejection::Permanent(format!(
                "file too large: {} bytes > {} maximum",
                size, self.config.max_file_bytes
            )));
        }

        let info = self
            .prober
            .probe(&artifact.file_path)
            .await
            .map_err(|e| ValidationRejection::Transient(e.to_string()))?;

        debug!(
            file = %artifact.file_path.display(),
            duration_secs = info.duration_secs,
            "probe complete"
        );

        if info.duration_secs < self.config.min_duration_secs {
            return Err(ValidationRejection::Permanent(format!(
                "replay too short: {:.1}s < {:.1}s minimum",
                info.duration_secs, self.config.min_duration_secs
            )));
        }
        if info.duration_secs > self.config.max_duration_secs {
            return Err(ValidationRejection::Permanent(format!(
                "replay too long: {:.1}s > {:.1}s maximum",
                info.duration_secs, self.config.max_duration_secs
            )));
        }

        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceIdentity;
    use crate::fakes::FakeProber;
    use chrono::Utc;
    use std::path::PathBuf;

    fn artifact_of_size(bytes: u64) -> ReplayArtifact {
        ReplayArtifact {
            file_path: PathBuf::from("/archives/rec/chan_odysee_1.flv"),
            file_size_bytes: bytes,
            duration_secs: None,
            source: SourceIdentity::new("chan"),
            label: "odysee".to_string(),
            content_hash: None,
            attempts: 0,
            completed_at: Utc::now(),
        }
    }

    fn gate_with_duration(duration_secs: f64) -> ValidationGate {
        ValidationGate::new(
            Arc::new(FakeProber::with_duration(duration_secs)),
            ValidationConfig::default(),
        )
    }

    #[tokio::test]
    async fn accepts_nominal_artifact() {
        let gate = gate_with_duration(120.0);
        let info = gate.validate(&artifact_of_size(50 * 1024 * 1024)).await.unwrap();
        assert_eq!(info.duration_secs, 120.0);
    }

    #[tokio::test]
    async fn rejects_below_size_floor_without_probing() {
        let prober = Arc::new(FakeProber::with_duration(120.0));
        let gate = ValidationGate::new(prober.clone(), ValidationConfig::default());

        let err = gate
            .validate(&artifact_of_size(5 * 1024 * 1024))
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationRejection::Permanent(_)));
        // Size check short-circuits; the prober is never consulted.
        assert_eq!(prober.calls(), 0);
    }

    #[tokio::test]
    async fn rejects_above_size_ceiling() {
        let gate = gate_with_duration(120.0);
        let err = gate
            .validate(&artifact_of_size(7 * 1024 * 1024 * 1024))
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationRejection::Permanent(_)));
    }

    #[tokio::test]
    async fn rejects_short_replay() {
        let gate = gate_with_duration(10.0);
        let err = gate
            .validate(&artifact_of_size(50 * 1024 * 1024))
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationRejection::Permanent(_)));
    }

    #[tokio::test]
    async fn rejects_overlong_replay() {
        let gate = gate_with_duration(7.0 * 3600.0);
        let err = gate
            .validate(&artifact_of_size(50 * 1024 * 1024))
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationRejection::Permanent(_)));
    }

    #[tokio::test]
    async fn probe_failure_is_transient() {
        let gate = ValidationGate::new(
            Arc::new(FakeProber::failing("ffprobe exited 1")),
            ValidationConfig::default(),
        );
        let err = gate
            .validate(&artifact_of_size(50 * 1024 * 1024))
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationRejection::Transient(_)));
    }
}
