use media_protocol::{FormatEntry, FrameRate, ProtocolError, VideoInfoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Required dependency not found: {0}")]
    DependencyNotFound(String),

    #[error("{0}")]
    InvalidInput(#[from] ProtocolError),

    #[error("{0}")]
    UpstreamUnavailable(String),

    #[error("No suitable format found")]
    NoSuitableFormat,

    #[error("Error converting audio: {0}")]
    TranscodeError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// One encoded stream option of a source video
#[derive(Debug, Clone, PartialEq)]
pub struct Rendition {
    /// Opaque id understood by the extractor (the itag)
    pub selector: String,

    /// Human readable quality, e.g. `720p60` or `medium`
    pub quality: String,

    pub has_video: bool,
    pub has_audio: bool,
    pub container: String,
    pub mime_type: String,

    /// Exact byte length, when the extractor knows it
    pub content_length: Option<u64>,

    pub fps: Option<u32>,
}

impl Rendition {
    pub fn is_muxed(&self) -> bool {
        self.has_video && self.has_audio
    }

    pub fn is_usable(&self) -> bool {
        self.has_video || self.has_audio
    }
}

impl From<&Rendition> for FormatEntry {
    fn from(rendition: &Rendition) -> Self {
        FormatEntry {
            itag: rendition.selector.clone(),
            quality: rendition.quality.clone(),
            has_audio: rendition.has_audio,
            has_video: rendition.has_video,
            container: rendition.container.clone(),
            content_length: rendition.content_length,
            mime_type: rendition.mime_type.clone(),
            fps: FrameRate::from_option(rendition.fps),
        }
    }
}

/// Title and renditions of one source video
#[derive(Debug, Clone, PartialEq)]
pub struct VideoManifest {
    pub title: String,
    pub renditions: Vec<Rendition>,
}

impl VideoManifest {
    pub fn muxed(&self) -> impl Iterator<Item = &Rendition> {
        self.renditions.iter().filter(|r| r.is_muxed())
    }
}

impl From<&VideoManifest> for VideoInfoResponse {
    fn from(manifest: &VideoManifest) -> Self {
        VideoInfoResponse {
            title: manifest.title.clone(),
            formats: manifest.renditions.iter().map(FormatEntry::from).collect(),
        }
    }
}

/// Target of the audio-only conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioTarget {
    /// ffmpeg muxer name
    pub format: String,

    /// ffmpeg encoder name
    pub codec: String,

    pub bitrate_kbps: u32,
}

impl AudioTarget {
    pub fn mp3(bitrate_kbps: u32) -> Self {
        Self {
            format: "mp3".to_string(),
            codec: "libmp3lame".to_string(),
            bitrate_kbps,
        }
    }
}

impl Default for AudioTarget {
    fn default() -> Self {
        Self::mp3(192)
    }
}
