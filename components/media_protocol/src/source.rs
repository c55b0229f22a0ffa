use crate::error::ProtocolError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use url::Url;

fn host_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(https?://)?(www\.)?(youtube\.com|youtu\.be)/.+").expect("valid host pattern")
    })
}

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == 11
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Newtype for a user supplied video URL on a recognized host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUrl {
    raw: String,
    video_id: String,
}

impl SourceUrl {
    /// Validate a raw URL; `None` and blank input count as missing
    pub fn parse(raw: Option<&str>) -> Result<Self, ProtocolError> {
        let raw = raw.map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return Err(ProtocolError::MissingUrl);
        }

        if !Self::matches_host(raw) {
            return Err(ProtocolError::UnrecognizedHost(raw.to_string()));
        }

        let video_id =
            extract_video_id(raw).ok_or_else(|| ProtocolError::MissingVideoId(raw.to_string()))?;

        Ok(SourceUrl {
            raw: raw.to_string(),
            video_id,
        })
    }

    /// Host check only, without requiring an extractable video id
    pub fn matches_host(raw: &str) -> bool {
        host_pattern().is_match(raw.trim())
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    /// Watch URL without playlist or tracking parameters
    pub fn canonical(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.video_id)
    }
}

impl fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn extract_video_id(raw: &str) -> Option<String> {
    let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };
    let url = Url::parse(&with_scheme).ok()?;
    let host = url.host_str()?.trim_start_matches("www.");
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    let candidate = match host {
        "youtu.be" => segments.next().map(str::to_string),
        _ => match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some("shorts" | "embed" | "live" | "v") => segments.next().map(str::to_string),
            _ => None,
        },
    }?;

    is_video_id(&candidate).then_some(candidate)
}
