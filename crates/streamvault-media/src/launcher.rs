//! Capture process launcher backed by an external ffmpeg process.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use streamvault_core::{
    CaptureConfig, CaptureHandle, CaptureLauncher, LaunchError, LaunchedCapture, SourceIdentity,
    TerminationReason,
};

/// Spawns `ffmpeg` against the ingest URL and supervises it until exit.
///
/// A clean ffmpeg exit (the ingest stream ended) reports `Normal`; a crash
/// or a kill requested through the handle reports `Abnormal`.
pub struct FfmpegLauncher {
    config: CaptureConfig,
}

impl FfmpegLauncher {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }

    fn input_url(&self, source: &SourceIdentity) -> String {
        self.config
            .input_url_template
            .replace("{source}", source.as_str())
    }
}

/// Arguments for a copy-remux capture of `input` into `output`.
fn capture_args(input: &str, output: &Path) -> Vec<String> {
    vec![
        "-err_detect".to_string(),
        "ignore_err".to_string(),
        "-ignore_unknown".to_string(),
        "-fflags".to_string(),
        "nobuffer+genpts+igndts".to_string(),
        "-i".to_string(),
        input.to_string(),
        "-c".to_string(),
        "copy".to_string(),
        output.to_string_lossy().into_owned(),
    ]
}

#[async_trait]
impl CaptureLauncher for FfmpegLauncher {
    async fn launch(
        &self,
        source: &SourceIdentity,
        output: &Path,
    ) -> Result<LaunchedCapture, LaunchError> {
        let input = self.input_url(source);

        let mut child = Command::new("ffmpeg")
            .args(capture_args(&input, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| LaunchError(e.to_string()))?;

        info!(input = %input, output = %output.display(), "ffmpeg capture started");

        let (term_tx, term_rx) = oneshot::channel();
        let (kill_tx, mut kill_rx) = mpsc::channel::<()>(1);
        let output_label = output.to_string_lossy().into_owned();

        tokio::spawn(async move {
            let reason = tokio::select! {
                status = child.wait() => match status {
                    Ok(status) if status.success() => TerminationReason::Normal,
                    Ok(status) => {
                        warn!(output = %output_label, %status, "ffmpeg exited abnormally");
                        TerminationReason::Abnormal
                    }
                    Err(e) => {
                        warn!(output = %output_label, error = %e, "ffmpeg wait failed");
                        TerminationReason::Abnormal
                    }
                },
                _ = kill_rx.recv() => {
                    // Non-graceful stop; the capture is not trusted afterwards.
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    info!(output = %output_label, "ffmpeg capture killed");
                    TerminationReason::Abnormal
                }
            };
            let _ = term_tx.send(reason);
        });

        Ok(LaunchedCapture {
            handle: CaptureHandle::new(kill_tx),
            termination: term_rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn capture_args_copy_remux_in_order() {
        let args = capture_args(
            "rtmp://ingest/live/chan",
            &PathBuf::from("/archives/rec/chan_odysee_1.flv"),
        );

        let i = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[i + 1], "rtmp://ingest/live/chan");

        let c = args.iter().position(|a| a == "-c").unwrap();
        assert_eq!(args[c + 1], "copy");
        assert!(i < c, "input options must precede output options");

        assert_eq!(args.last().unwrap(), "/archives/rec/chan_odysee_1.flv");
        assert!(args.contains(&"-ignore_unknown".to_string()));
    }

    #[test]
    fn input_url_substitutes_source() {
        let launcher = FfmpegLauncher::new(CaptureConfig {
            recordings_dir: PathBuf::from("/archives/rec"),
            input_url_template: "rtmp://nginx-server/live/{source}".to_string(),
        });
        assert_eq!(
            launcher.input_url(&SourceIdentity::new("somechannel")),
            "rtmp://nginx-server/live/somechannel"
        );
    }
}
