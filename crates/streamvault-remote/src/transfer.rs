//! scp-based replay transfer.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use streamvault_core::{RemoteConfig, ReplayTransfer, TransferError};

/// Copies a local file to the remote transcode host via the system `scp`.
///
/// Authentication uses the pre-provisioned identity file from the config;
/// uploads land in the remote ingest directory under their local file name,
/// so re-transfers overwrite rather than duplicate.
pub struct ScpTransfer {
    config: RemoteConfig,
}

impl ScpTransfer {
    pub fn new(config: RemoteConfig) -> Self {
        Self { config }
    }

    fn scp_args(&self, local: &Path, remote_name: &str) -> Vec<String> {
        vec![
            "-B".to_string(),
            "-P".to_string(),
            self.config.port.to_string(),
            "-i".to_string(),
            self.config.identity_file.to_string_lossy().into_owned(),
            local.to_string_lossy().into_owned(),
            format!(
                "{}@{}:{}/{}",
                self.config.user, self.config.host, self.config.remote_dir, remote_name
            ),
        ]
    }
}

#[async_trait]
impl ReplayTransfer for ScpTransfer {
    async fn transfer(&self, local: &Path, remote_name: &str) -> Result<(), TransferError> {
        let output = Command::new("scp")
            .args(self.scp_args(local, remote_name))
            .output()
            .await
            .map_err(|e| TransferError(format!("failed to run scp: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TransferError(format!(
                "scp exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        info!(
            file = %local.display(),
            host = %self.config.host,
            remote_name = %remote_name,
            "replay transferred"
        );
        Ok(())
    }
}
