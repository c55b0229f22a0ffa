use serde::{Deserialize, Deserializer, Serialize};

/// Query string of `GET /video-info`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoInfoQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Query string of `GET /download`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Only the literal `true` asks for audio; any other value means video
    #[serde(rename = "isAudio", default, deserialize_with = "audio_flag")]
    pub is_audio: bool,

    /// Either a rendition selector (itag) or a quality label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
}

fn audio_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(flag)) => flag,
        Some(Flag::Text(text)) => text == "true",
        None => false,
    })
}

impl DownloadQuery {
    pub fn output_kind(&self) -> OutputKind {
        if self.is_audio {
            OutputKind::AudioOnly
        } else {
            OutputKind::Muxed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfoResponse {
    pub title: String,
    pub formats: Vec<FormatEntry>,
}

/// One rendition as reported to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatEntry {
    pub itag: String,
    pub quality: String,
    pub has_audio: bool,
    pub has_video: bool,
    pub container: String,
    #[serde(default)]
    pub content_length: Option<u64>,
    pub mime_type: String,
    pub fps: FrameRate,
}

impl FormatEntry {
    pub fn is_muxed(&self) -> bool {
        self.has_video && self.has_audio
    }
}

/// Frame rate of a rendition; `"N/A"` when the rendition has none
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrameRate {
    Rate(u32),
    Label(String),
}

impl FrameRate {
    pub fn from_option(fps: Option<u32>) -> Self {
        match fps {
            Some(rate) => FrameRate::Rate(rate),
            None => FrameRate::Label("N/A".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// What a download produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Muxed,
    AudioOnly,
}

impl OutputKind {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputKind::Muxed => "mp4",
            OutputKind::AudioOnly => "mp3",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputKind::Muxed => "video/mp4",
            OutputKind::AudioOnly => "audio/mpeg",
        }
    }
}
