use crate::extractor::Extractor;
use crate::stream::MediaStream;
use crate::transcoder::Transcoder;
use crate::types::{AudioTarget, RelayError, Rendition, VideoManifest};
use media_protocol::{attachment_filename, OutputKind, SourceUrl};
use std::sync::Arc;

/// A rendition ready to be streamed to the caller
#[derive(Debug)]
pub struct Download {
    pub filename: String,
    pub kind: OutputKind,
    pub stream: MediaStream,
}

impl Download {
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }

    pub fn content_type(&self) -> &'static str {
        self.kind.content_type()
    }

    pub fn content_length(&self) -> Option<u64> {
        self.stream.content_length()
    }
}

/// Pick the muxed rendition for a requested selector or quality label
///
/// Falls back to the first muxed rendition when nothing matches.
pub fn select_muxed<'a>(manifest: &'a VideoManifest, requested: Option<&str>) -> Option<&'a Rendition> {
    let requested = requested.map(str::trim).filter(|q| !q.is_empty());
    if let Some(wanted) = requested {
        let matched = manifest
            .muxed()
            .find(|r| r.selector == wanted)
            .or_else(|| manifest.muxed().find(|r| r.quality == wanted));
        if matched.is_some() {
            return matched;
        }
        tracing::info!("No muxed rendition matches {:?}, using the first one", wanted);
    }
    manifest.muxed().next()
}

pub struct Relay {
    extractor: Arc<dyn Extractor>,
    transcoder: Arc<dyn Transcoder>,
    audio_target: AudioTarget,
}

impl Relay {
    /// Create a relay after checking that both collaborators are installed
    pub async fn new(
        extractor: Arc<dyn Extractor>,
        transcoder: Arc<dyn Transcoder>,
        audio_target: AudioTarget,
    ) -> Result<Self, RelayError> {
        extractor.check_available().await?;
        transcoder.check_available().await?;

        Ok(Self {
            extractor,
            transcoder,
            audio_target,
        })
    }

    pub fn audio_target(&self) -> &AudioTarget {
        &self.audio_target
    }

    /// Title and usable renditions of a source video
    pub async fn list_renditions(&self, url: Option<&str>) -> Result<VideoManifest, RelayError> {
        let source = SourceUrl::parse(url)?;
        let manifest = self.usable_manifest(&source).await?;
        tracing::info!("Sending response with {} formats", manifest.renditions.len());
        Ok(manifest)
    }

    /// Open the bytes of a rendition, converting to audio when asked
    pub async fn fetch_rendition(
        &self,
        url: Option<&str>,
        selector: Option<&str>,
        want_audio_only: bool,
    ) -> Result<Download, RelayError> {
        let source = SourceUrl::parse(url)?;
        let manifest = self.usable_manifest(&source).await?;

        if want_audio_only {
            self.fetch_audio(&source, &manifest).await
        } else {
            self.fetch_muxed(&source, &manifest, selector).await
        }
    }

    async fn usable_manifest(&self, source: &SourceUrl) -> Result<VideoManifest, RelayError> {
        let mut manifest = self.extractor.fetch_manifest(source).await.map_err(|e| match e {
            RelayError::UpstreamUnavailable(_) => e,
            other => RelayError::UpstreamUnavailable(other.to_string()),
        })?;

        manifest.renditions.retain(Rendition::is_usable);
        if manifest.renditions.is_empty() {
            return Err(RelayError::UpstreamUnavailable(
                "No suitable formats found for this video".to_string(),
            ));
        }
        Ok(manifest)
    }

    async fn fetch_audio(
        &self,
        source: &SourceUrl,
        manifest: &VideoManifest,
    ) -> Result<Download, RelayError> {
        tracing::info!("Starting audio download");
        let audio = self.extractor.open_best_audio(source).await?;

        tracing::info!("Starting audio conversion");
        let converted = self.transcoder.transcode(audio, &self.audio_target).await?;
        let stream = converted
            .primed()
            .await
            .map_err(|e| RelayError::TranscodeError(e.to_string()))?;

        Ok(Download {
            filename: attachment_filename(&manifest.title, OutputKind::AudioOnly),
            kind: OutputKind::AudioOnly,
            stream,
        })
    }

    async fn fetch_muxed(
        &self,
        source: &SourceUrl,
        manifest: &VideoManifest,
        selector: Option<&str>,
    ) -> Result<Download, RelayError> {
        tracing::info!("Starting video download with quality: {:?}", selector);
        let rendition = select_muxed(manifest, selector).ok_or(RelayError::NoSuitableFormat)?;
        tracing::info!(
            "Selected format: quality={} itag={} container={} content_length={:?}",
            rendition.quality,
            rendition.selector,
            rendition.container,
            rendition.content_length
        );

        let stream = self
            .extractor
            .open_rendition(source, rendition)
            .await?
            .with_progress_log(format!("itag {}", rendition.selector));

        Ok(Download {
            filename: attachment_filename(&manifest.title, OutputKind::Muxed),
            kind: OutputKind::Muxed,
            stream,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::stub::{rendition, ExtractorStub};
    use crate::transcoder::stub::TranscoderStub;
    use assert_matches::assert_matches;
    use futures::StreamExt;
    use media_protocol::ProtocolError;
    use rstest::rstest;

    const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    fn mixed_renditions() -> Vec<Rendition> {
        vec![
            rendition("137", "1080p", true, false),
            rendition("140", "medium", false, true),
            rendition("18", "360p", true, true),
            rendition("22", "720p", true, true),
        ]
    }

    async fn relay_with(extractor: Arc<ExtractorStub>, fail_transcode: bool) -> Relay {
        Relay::new(
            extractor,
            Arc::new(TranscoderStub {
                fail: fail_transcode,
            }),
            AudioTarget::default(),
        )
        .await
        .unwrap()
    }

    async fn body(download: Download) -> Vec<u8> {
        let mut bytes = Vec::new();
        let mut stream = download.stream;
        while let Some(chunk) = stream.next().await {
            bytes.extend_from_slice(&chunk.unwrap());
        }
        bytes
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("https://vimeo.com/1234"))]
    #[case(Some("https://www.youtube.com/feed/trending"))]
    #[tokio::test]
    async fn test_invalid_urls_never_reach_upstream(#[case] url: Option<&str>) {
        let extractor = Arc::new(ExtractorStub::new(mixed_renditions()));
        let relay = relay_with(extractor.clone(), false).await;

        assert_matches!(
            relay.list_renditions(url).await,
            Err(RelayError::InvalidInput(_))
        );
        assert_matches!(
            relay.fetch_rendition(url, None, false).await,
            Err(RelayError::InvalidInput(_))
        );
        assert_matches!(
            relay.fetch_rendition(url, None, true).await,
            Err(RelayError::InvalidInput(_))
        );
        assert_eq!(extractor.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_url_message() {
        let relay = relay_with(Arc::new(ExtractorStub::new(mixed_renditions())), false).await;
        let err = relay.list_renditions(Some("https://example.com/x")).await.unwrap_err();
        assert_matches!(
            err,
            RelayError::InvalidInput(ProtocolError::UnrecognizedHost(_))
        );
        assert_eq!(err.to_string(), "Please provide a valid YouTube URL");
    }

    #[tokio::test]
    async fn test_list_filters_unusable_renditions() {
        let mut renditions = mixed_renditions();
        renditions.push(rendition("sb0", "storyboard", false, false));
        let relay = relay_with(Arc::new(ExtractorStub::new(renditions)), false).await;

        let manifest = relay.list_renditions(Some(URL)).await.unwrap();
        assert_eq!(manifest.title, "Test Video: Part 1!");
        assert_eq!(manifest.renditions.len(), 4);
        assert!(manifest.renditions.iter().all(Rendition::is_usable));
    }

    #[tokio::test]
    async fn test_list_without_usable_renditions_is_upstream_failure() {
        let relay = relay_with(
            Arc::new(ExtractorStub::new(vec![rendition("sb0", "storyboard", false, false)])),
            false,
        )
        .await;

        assert_matches!(
            relay.list_renditions(Some(URL)).await,
            Err(RelayError::UpstreamUnavailable(msg)) if msg.contains("No suitable formats")
        );
    }

    #[tokio::test]
    async fn test_extractor_failure_is_upstream_failure() {
        let relay = relay_with(Arc::new(ExtractorStub::unavailable()), false).await;
        assert_matches!(
            relay.list_renditions(Some(URL)).await,
            Err(RelayError::UpstreamUnavailable(_))
        );
    }

    #[tokio::test]
    async fn test_no_muxed_rendition_is_no_suitable_format() {
        let extractor = Arc::new(ExtractorStub::new(vec![
            rendition("137", "1080p", true, false),
            rendition("140", "medium", false, true),
        ]));
        let relay = relay_with(extractor.clone(), false).await;

        assert_matches!(
            relay.fetch_rendition(Some(URL), Some("1080p"), false).await,
            Err(RelayError::NoSuitableFormat)
        );
        assert!(extractor.opened().is_empty());
    }

    #[rstest]
    #[case(Some("22"), "22")]
    #[case(Some("720p"), "22")]
    #[case(Some("360p"), "18")]
    #[case(Some("4320p"), "18")]
    #[case(Some("137"), "18")]
    #[case(None, "18")]
    #[tokio::test]
    async fn test_muxed_selection(#[case] requested: Option<&str>, #[case] expected: &str) {
        let extractor = Arc::new(ExtractorStub::new(mixed_renditions()));
        let relay = relay_with(extractor.clone(), false).await;

        let download = relay.fetch_rendition(Some(URL), requested, false).await.unwrap();
        assert_eq!(extractor.opened(), vec![expected.to_string()]);
        assert_eq!(download.kind, OutputKind::Muxed);
        assert_eq!(download.filename, "Test Video Part 1.mp4");
        assert_eq!(download.content_length(), Some(4));
        assert_eq!(body(download).await, b"mux!");
    }

    #[tokio::test]
    async fn test_audio_only_is_transcoded_to_mp3() {
        let extractor = Arc::new(ExtractorStub::new(mixed_renditions()));
        let relay = relay_with(extractor.clone(), false).await;

        let download = relay.fetch_rendition(Some(URL), Some("720p"), true).await.unwrap();
        assert_eq!(extractor.opened(), vec!["bestaudio".to_string()]);
        assert_eq!(download.filename, "Test Video Part 1.mp3");
        assert_eq!(download.content_type(), "audio/mpeg");
        assert_eq!(
            download.content_disposition(),
            "attachment; filename=\"Test Video Part 1.mp3\""
        );
        assert_eq!(download.content_length(), None);
        assert_eq!(body(download).await, b"OPUS");
    }

    #[tokio::test]
    async fn test_audio_only_works_without_muxed_renditions() {
        let extractor = Arc::new(ExtractorStub::new(vec![rendition("251", "medium", false, true)]));
        let relay = relay_with(extractor, false).await;

        let download = relay.fetch_rendition(Some(URL), None, true).await.unwrap();
        assert!(download.filename.ends_with(".mp3"));
    }

    #[tokio::test]
    async fn test_transcoder_failure_before_output() {
        let relay = relay_with(Arc::new(ExtractorStub::new(mixed_renditions())), true).await;
        assert_matches!(
            relay.fetch_rendition(Some(URL), None, true).await,
            Err(RelayError::TranscodeError(msg)) if msg.contains("Invalid data")
        );
    }

    #[test]
    fn test_select_ignores_blank_request() {
        let manifest = VideoManifest {
            title: "t".to_string(),
            renditions: mixed_renditions(),
        };
        let chosen = select_muxed(&manifest, Some("  ")).unwrap();
        assert_eq!(chosen.selector, "18");
    }
}
