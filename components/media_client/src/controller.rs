//! Download controller state machine
//!
//! One controller per page load (or CLI run):
//!
//! ```text
//! Idle -> FetchingInfo -> InfoReady -> Downloading -> Idle
//!              |                            |
//!              +----------> Error <---------+
//!                             |
//!                             +-> Idle
//! ```

use crate::client::RelayApi;
use crate::error::ClientError;
use crate::progress::{Progress, TransferSession};
use crate::quality::{quality_options, selector_for};
use bytes::BytesMut;
use futures::StreamExt;
use media_protocol::{attachment_filename, DownloadQuery, OutputKind, SourceUrl, VideoInfoResponse};

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Idle,
    FetchingInfo,
    InfoReady,
    Downloading(TransferSession),
    Error(String),
}

/// Bytes of a finished download and the name to save them under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedMedia {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct Controller {
    phase: Phase,
    info: Option<VideoInfoResponse>,
    kind: OutputKind,
    quality: Option<String>,
    online: bool,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            info: None,
            kind: OutputKind::Muxed,
            quality: None,
            online: true,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn info(&self) -> Option<&VideoInfoResponse> {
        self.info.as_ref()
    }

    pub fn kind(&self) -> OutputKind {
        self.kind
    }

    pub fn selected_quality(&self) -> Option<&str> {
        self.quality.as_deref()
    }

    /// Connectivity indicator
    pub fn is_online(&self) -> bool {
        self.online
    }

    /// The quality selector is hidden for audio-only downloads
    pub fn shows_quality_selector(&self) -> bool {
        self.kind == OutputKind::Muxed
    }

    /// Options for the quality selector, recomputed from the held renditions
    pub fn quality_options(&self) -> Vec<String> {
        match (&self.info, self.kind) {
            (Some(info), OutputKind::Muxed) => quality_options(&info.formats),
            _ => Vec::new(),
        }
    }

    /// Toggle between muxed and audio-only downloads
    pub fn set_kind(&mut self, kind: OutputKind) {
        self.kind = kind;
        let options = self.quality_options();
        let still_offered = self
            .quality
            .as_ref()
            .is_some_and(|q| options.contains(q));
        if !still_offered {
            self.quality = options.into_iter().next();
        }
    }

    pub fn select_quality(&mut self, label: &str) -> Result<(), ClientError> {
        if !self.quality_options().iter().any(|q| q == label) {
            return Err(ClientError::Validation(format!(
                "Quality {} is not available for this video",
                label
            )));
        }
        self.quality = Some(label.to_string());
        Ok(())
    }

    /// Leave the error state
    pub fn acknowledge(&mut self) {
        if matches!(self.phase, Phase::Error(_)) {
            self.phase = Phase::Idle;
        }
    }

    fn busy(&self) -> bool {
        matches!(self.phase, Phase::FetchingInfo | Phase::Downloading(_))
    }

    /// Record a failure: shows the message, drops the held renditions
    fn fail(&mut self, err: ClientError) -> ClientError {
        if err.is_network() {
            self.online = false;
        }
        tracing::warn!("{}", err);
        self.phase = Phase::Error(err.to_string());
        self.info = None;
        self.quality = None;
        err
    }

    fn validate(url: &str) -> Result<SourceUrl, ClientError> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(ClientError::Validation("Please enter a YouTube URL".to_string()));
        }
        if !SourceUrl::matches_host(trimmed) {
            return Err(ClientError::Validation(
                "Please enter a valid YouTube URL".to_string(),
            ));
        }
        Ok(SourceUrl::parse(Some(trimmed))?)
    }

    /// "Fetch info": list the renditions of `url` and fill the quality selector
    pub async fn fetch_info(
        &mut self,
        api: &dyn RelayApi,
        url: &str,
    ) -> Result<(), ClientError> {
        if self.busy() {
            return Err(ClientError::InvalidState("A request is already running"));
        }
        let source = Self::validate(url).map_err(|e| self.fail(e))?;

        self.phase = Phase::FetchingInfo;
        let info = match api.video_info(&source).await {
            Ok(info) if info.formats.is_empty() => {
                return Err(self.fail(ClientError::Server(
                    "No available formats found for this video".to_string(),
                )))
            }
            Ok(info) => info,
            Err(e) => return Err(self.fail(e)),
        };

        self.online = true;
        self.info = Some(info);
        self.quality = None;
        let kind = self.kind;
        self.set_kind(kind);
        self.phase = Phase::InfoReady;
        Ok(())
    }

    /// "Download": stream the chosen rendition, reporting progress per chunk
    pub async fn download<F>(
        &mut self,
        api: &dyn RelayApi,
        url: &str,
        mut on_progress: F,
    ) -> Result<SavedMedia, ClientError>
    where
        F: FnMut(Progress) + Send,
    {
        if self.busy() {
            return Err(ClientError::InvalidState("A request is already running"));
        }
        let source = Self::validate(url).map_err(|e| self.fail(e))?;

        let quality = match (self.kind, &self.info, &self.quality) {
            (OutputKind::Muxed, Some(info), Some(label)) => {
                selector_for(&info.formats, label).map(str::to_string)
            }
            _ => None,
        };
        let query = DownloadQuery {
            url: Some(source.as_str().to_string()),
            is_audio: self.kind == OutputKind::AudioOnly,
            quality,
        };

        self.phase = Phase::Downloading(TransferSession::new(None));
        let transfer = match api.download(&query).await {
            Ok(transfer) => transfer,
            Err(e) => return Err(self.fail(e)),
        };

        let mut session = TransferSession::new(transfer.content_length);
        self.phase = Phase::Downloading(session);
        on_progress(session.progress());

        let mut buffer = BytesMut::new();
        let mut body = transfer.body;
        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => return Err(self.fail(e)),
            };
            buffer.extend_from_slice(&chunk);
            let progress = session.record(chunk.len());
            self.phase = Phase::Downloading(session);
            on_progress(progress);
        }

        let filename = match (&self.info, transfer.filename) {
            (Some(info), _) => attachment_filename(&info.title, self.kind),
            (None, Some(announced)) => announced,
            (None, None) => attachment_filename("", self.kind),
        };

        self.online = true;
        self.phase = Phase::Idle;
        Ok(SavedMedia {
            filename,
            bytes: buffer.to_vec(),
        })
    }
}
