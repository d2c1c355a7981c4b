//! ffmpeg-backed collaborator implementations.
//!
//! `FfmpegLauncher` records a live source into a local file by remuxing the
//! ingest stream with `-c copy`; `FfprobeProber` reads duration and stream
//! metadata from finished files.

pub mod launcher;
pub mod prober;

pub use launcher::FfmpegLauncher;
pub use prober::FfprobeProber;
