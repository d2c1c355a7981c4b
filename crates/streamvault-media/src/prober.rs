//! Media prober backed by an external ffprobe process.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use streamvault_core::{MediaInfo, MediaProber, ProbeError};

/// Runs `ffprobe` with JSON output and extracts duration plus stream kinds.
#[derive(Debug, Default)]
pub struct FfprobeProber;

impl FfprobeProber {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
}

#[derive(Deserialize)]
struct FfprobeFormat {
    // ffprobe reports duration as a decimal string.
    duration: Option<String>,
}

fn parse_ffprobe_output(raw: &[u8]) -> Result<MediaInfo, ProbeError> {
    let parsed: FfprobeOutput = serde_json::from_slice(raw)
        .map_err(|e| ProbeError(format!("unparseable ffprobe output: {e}")))?;

    let duration_secs = parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| ProbeError("ffprobe reported no container duration".to_string()))?;

    let count = |kind: &str| {
        parsed
            .streams
            .iter()
            .filter(|s| s.codec_type.as_deref() == Some(kind))
            .count()
    };

    Ok(MediaInfo {
        duration_secs,
        video_streams: count("video"),
        audio_streams: count("audio"),
    })
}

#[async_trait]
impl MediaProber for FfprobeProber {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, ProbeError> {
        let output = Command::new("ffprobe")
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output()
            .await
            .map_err(|e| ProbeError(format!("failed to run ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(ProbeError(format!(
                "ffprobe exited with {} for {}",
                output.status,
                path.display()
            )));
        }

        let info = parse_ffprobe_output(&output.stdout)?;
        debug!(file = %path.display(), duration_secs = info.duration_secs, "probed");
        Ok(info)
    }
}
