use crate::stream::{collect_stderr, MediaStream};
use crate::types::{AudioTarget, RelayError};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::io::StreamReader;

/// Re-encodes a byte stream into the configured audio target
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn check_available(&self) -> Result<(), RelayError>;

    async fn transcode(
        &self,
        input: MediaStream,
        target: &AudioTarget,
    ) -> Result<MediaStream, RelayError>;
}

/// `ffmpeg` executable reading `pipe:0` and writing `pipe:1`
pub struct Ffmpeg {
    program: PathBuf,
}

/// Keys ffmpeg emits on `-progress pipe:2`
const PROGRESS_KEYS: &[&str] = &[
    "frame",
    "fps",
    "bitrate",
    "total_size",
    "out_time_us",
    "out_time_ms",
    "out_time",
    "dup_frames",
    "drop_frames",
    "speed",
    "progress",
];

impl Ffmpeg {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    fn args(target: &AudioTarget) -> Vec<String> {
        vec![
            "-hide_banner".into(),
            "-nostats".into(),
            "-loglevel".into(),
            "error".into(),
            "-progress".into(),
            "pipe:2".into(),
            "-i".into(),
            "pipe:0".into(),
            "-vn".into(),
            "-codec:a".into(),
            target.codec.clone(),
            "-b:a".into(),
            format!("{}k", target.bitrate_kbps),
            "-f".into(),
            target.format.clone(),
            "pipe:1".into(),
        ]
    }
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

/// Log a progress line; returns `false` for progress output, `true` for
/// anything that looks like a diagnostic
fn log_stderr_line(line: &str) -> bool {
    match line.split_once('=') {
        Some((key, value)) if PROGRESS_KEYS.contains(&key) || key.starts_with("stream_") => {
            match key {
                "out_time" => tracing::debug!("Processing: {} done", value),
                "progress" if value == "end" => tracing::info!("Audio conversion finished"),
                _ => {}
            }
            false
        }
        _ => {
            tracing::warn!("ffmpeg: {}", line);
            true
        }
    }
}

#[async_trait]
impl Transcoder for Ffmpeg {
    async fn check_available(&self) -> Result<(), RelayError> {
        which::which(&self.program)
            .map(|_| ())
            .map_err(|_| RelayError::DependencyNotFound(self.program_name()))
    }

    async fn transcode(
        &self,
        input: MediaStream,
        target: &AudioTarget,
    ) -> Result<MediaStream, RelayError> {
        let mut child = Command::new(&self.program)
            .args(Self::args(target))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                RelayError::TranscodeError(format!("failed to start {}: {}", self.program_name(), e))
            })?;
        tracing::info!("FFmpeg started processing");

        let mut stdin = child.stdin.take().ok_or_else(|| {
            RelayError::TranscodeError(format!("{} stdin not captured", self.program_name()))
        })?;

        // Feeding stops on its own when ffmpeg closes its end of the pipe.
        let feeder = tokio::spawn(async move {
            let mut reader = StreamReader::new(input);
            let fed = tokio::io::copy(&mut reader, &mut stdin).await;
            match &fed {
                Ok(bytes) => tracing::debug!("Fed {} bytes to the transcoder", bytes),
                Err(e) => tracing::warn!("Transcoder input failed: {}", e),
            }
            fed
        });

        let diagnostics = child
            .stderr
            .take()
            .map(|stderr| collect_stderr(stderr, log_stderr_line));

        Ok(MediaStream::from_child(child, self.program_name(), None, diagnostics)?.fed_by(feeder))
    }
}
