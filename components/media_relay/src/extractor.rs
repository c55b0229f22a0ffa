use crate::stream::{collect_stderr, MediaStream};
use crate::types::{RelayError, Rendition, VideoManifest};
use async_trait::async_trait;
use media_protocol::SourceUrl;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Resolves source URLs to renditions and opens rendition byte streams
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Check if the extractor is available and has all required dependencies
    async fn check_available(&self) -> Result<(), RelayError>;

    /// Fetch title and renditions without downloading anything
    async fn fetch_manifest(&self, source: &SourceUrl) -> Result<VideoManifest, RelayError>;

    /// Open the byte stream of one rendition
    async fn open_rendition(
        &self,
        source: &SourceUrl,
        rendition: &Rendition,
    ) -> Result<MediaStream, RelayError>;

    /// Open the highest quality audio-only stream
    async fn open_best_audio(&self, source: &SourceUrl) -> Result<MediaStream, RelayError>;
}

/// `yt-dlp` executable
pub struct YtDlp {
    program: PathBuf,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    fn open(
        &self,
        source: &SourceUrl,
        format: &str,
        content_length: Option<u64>,
    ) -> Result<MediaStream, RelayError> {
        let mut child = Command::new(&self.program)
            .arg("--quiet")
            .arg("--no-warnings")
            .arg("--no-playlist")
            .arg("--format").arg(format)
            .arg("--output").arg("-")
            .arg(source.canonical())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                RelayError::UpstreamUnavailable(format!("failed to start {}: {}", self.program_name(), e))
            })?;

        let diagnostics = child.stderr.take().map(|stderr| {
            collect_stderr(stderr, |line| {
                tracing::warn!("yt-dlp: {}", line);
                true
            })
        });

        tracing::info!("Streaming format {} of {}", format, source.video_id());
        Ok(MediaStream::from_child(
            child,
            self.program_name(),
            content_length,
            diagnostics,
        )?)
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl Extractor for YtDlp {
    async fn check_available(&self) -> Result<(), RelayError> {
        which::which(&self.program)
            .map(|_| ())
            .map_err(|_| RelayError::DependencyNotFound(self.program_name()))
    }

    async fn fetch_manifest(&self, source: &SourceUrl) -> Result<VideoManifest, RelayError> {
        tracing::info!("Fetching video info for ID: {}", source.video_id());

        let output = Command::new(&self.program)
            .arg("--dump-json")
            .arg("--no-download")
            .arg("--no-playlist")
            .arg("--no-warnings")
            .arg(source.canonical())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                RelayError::UpstreamUnavailable(format!("failed to run {}: {}", self.program_name(), e))
            })?;

        if !output.status.success() {
            return Err(RelayError::UpstreamUnavailable(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let yt_meta: YtDlpMetadata = serde_json::from_slice(&output.stdout)
            .map_err(|e| RelayError::UpstreamUnavailable(e.to_string()))?;

        tracing::debug!("{:#?}", yt_meta);

        Ok(yt_meta.into_manifest())
    }

    async fn open_rendition(
        &self,
        source: &SourceUrl,
        rendition: &Rendition,
    ) -> Result<MediaStream, RelayError> {
        self.open(source, &rendition.selector, rendition.content_length)
    }

    async fn open_best_audio(&self, source: &SourceUrl) -> Result<MediaStream, RelayError> {
        self.open(source, "bestaudio", None)
    }
}

#[derive(Debug, Deserialize)]
struct YtDlpMetadata {
    title: String,
    #[serde(default)]
    formats: Vec<YtDlpFormat>,
}

#[derive(Debug, Deserialize)]
struct YtDlpFormat {
    format_id: String,
    ext: Option<String>,
    vcodec: Option<String>,
    acodec: Option<String>,
    height: Option<u32>,
    fps: Option<f64>,
    format_note: Option<String>,
    filesize: Option<u64>,
}

fn present_codec(codec: &Option<String>) -> Option<&str> {
    codec
        .as_deref()
        .filter(|c| !c.is_empty() && *c != "none")
}

impl YtDlpMetadata {
    fn into_manifest(self) -> VideoManifest {
        VideoManifest {
            title: self.title,
            renditions: self.formats.into_iter().map(YtDlpFormat::into_rendition).collect(),
        }
    }
}

impl YtDlpFormat {
    fn into_rendition(self) -> Rendition {
        let video_codec = present_codec(&self.vcodec);
        let audio_codec = present_codec(&self.acodec);
        let has_video = video_codec.is_some();
        let has_audio = audio_codec.is_some();
        let fps = self
            .fps
            .filter(|rate| has_video && *rate > 0.0)
            .map(|rate| rate.round() as u32);
        let container = self.ext.clone().unwrap_or_else(|| "unknown".to_string());

        let quality = match (has_video, self.height) {
            (true, Some(height)) => match fps {
                Some(rate) if rate > 30 => format!("{}p{}", height, rate),
                _ => format!("{}p", height),
            },
            _ => self
                .format_note
                .clone()
                .filter(|note| !note.is_empty())
                .unwrap_or_else(|| (if has_audio { "audio" } else { "unknown" }).to_string()),
        };

        let codecs: Vec<&str> = video_codec.into_iter().chain(audio_codec).collect();
        let mime_type = format!(
            "{}/{}; codecs=\"{}\"",
            if has_video { "video" } else { "audio" },
            container,
            codecs.join(", ")
        );

        Rendition {
            selector: self.format_id,
            quality,
            has_video,
            has_audio,
            container,
            mime_type,
            content_length: self.filesize,
            fps,
        }
    }
}
