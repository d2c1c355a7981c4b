//! Replay artifacts - completed captures awaiting processing.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::digest::ContentDigest;
use super::session::SourceIdentity;

/// One completed capture file, pending the replay processing pipeline.
///
/// The pipeline owns an artifact exclusively for the duration of one
/// processing run; terminal states are deletion (success) or quarantine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayArtifact {
    /// Local path of the finished capture file.
    pub file_path: PathBuf,

    /// File size in bytes, captured at artifact creation.
    pub file_size_bytes: u64,

    /// Probed media duration. Populated only after a successful probe.
    pub duration_secs: Option<f64>,

    /// Source the capture was recorded from.
    pub source: SourceIdentity,

    /// Capture label (distinguishes parallel captures of one source).
    pub label: String,

    /// Content hash, computed lazily just before acknowledgment.
    pub content_hash: Option<ContentDigest>,

    /// Number of pipeline attempts consumed so far. Monotonic.
    pub attempts: u32,

    /// When the capture finished.
    pub completed_at: DateTime<Utc>,
}

impl ReplayArtifact {
    /// Build an artifact for a finished capture file, reading its size from
    /// the filesystem.
    pub async fn from_capture(
        file_path: PathBuf,
        source: SourceIdentity,
        label: impl Into<String>,
    ) -> std::io::Result<Self> {
        let meta = tokio::fs::metadata(&file_path).await?;
        Ok(Self {
            file_path,
            file_size_bytes: meta.len(),
            duration_secs: None,
            source,
            label: label.into(),
            content_hash: None,
            attempts: 0,
            completed_at: Utc::now(),
        })
    }

    /// The artifact's bare file name, used as its identity on the remote
    /// transcode host.
    pub fn file_name(&self) -> String {
        self.file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Ensure the content hash is computed, returning it.
    pub async fn ensure_content_hash(
        &mut self,
    ) -> Result<&ContentDigest, super::digest::DigestError> {
        if self.content_hash.is_none() {
            let digest = ContentDigest::from_file(Path::new(&self.file_path)).await?;
            self.content_hash = Some(digest);
        }
        Ok(self
            .content_hash
            .as_ref()
            .unwrap_or_else(|| unreachable!("hash set above")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn from_capture_reads_file_size() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&[0u8; 2048]).unwrap();
        tmp.flush().unwrap();

        let artifact = ReplayArtifact::from_capture(
            tmp.path().to_path_buf(),
            SourceIdentity::new("chan"),
            "odysee",
        )
        .await
        .unwrap();

        assert_eq!(artifact.file_size_bytes, 2048);
        assert_eq!(artifact.attempts, 0);
        assert!(artifact.duration_secs.is_none());
        assert!(artifact.content_hash.is_none());
    }

    #[tokio::test]
    async fn content_hash_is_computed_once() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"capture").unwrap();
        tmp.flush().unwrap();

        let mut artifact = ReplayArtifact::from_capture(
            tmp.path().to_path_buf(),
            SourceIdentity::new("chan"),
            "odysee",
        )
        .await
        .unwrap();

        let first = artifact.ensure_content_hash().await.unwrap().clone();
        let second = artifact.ensure_content_hash().await.unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(first, ContentDigest::from_bytes(b"capture"));
    }
}
