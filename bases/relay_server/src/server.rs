// bases/relay_server/src/server.rs
use crate::config::Config;
use crate::error::AppError;
use askama::Template;
use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, HeaderValue, Method},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use color_eyre::eyre::WrapErr;
use media_protocol::{DownloadQuery, VideoInfoQuery, VideoInfoResponse};
use media_relay::{AudioTarget, Ffmpeg, Relay, YtDlp};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    relay: Arc<Relay>,
}

impl AppState {
    pub fn new(relay: Relay) -> Self {
        Self {
            relay: Arc::new(relay),
        }
    }
}

/// Download page
#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    audio_bitrate: u32,
}

/// Build the relay router
pub fn router(state: AppState, config: &Config) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([header::CONTENT_LENGTH, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(index))
        .route("/video-info", get(video_info))
        .route("/download", get(download))
        .route("/ping", get(ping))
        .route("/test", get(ping))
        .nest_service("/static", ServeDir::new(&config.static_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the relay HTTP server
pub async fn run(config: Config) -> color_eyre::Result<()> {
    info!("Checking yt-dlp at {} and ffmpeg at {}", config.yt_dlp.display(), config.ffmpeg.display());
    let relay = Relay::new(
        Arc::new(YtDlp::new(&config.yt_dlp)),
        Arc::new(Ffmpeg::new(&config.ffmpeg)),
        AudioTarget::mp3(config.audio_bitrate),
    )
    .await?;

    let app = router(AppState::new(relay), &config);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("failed to bind {} (is the port already in use?)", addr))?;

    info!("Server running at http://localhost:{}", config.port);
    info!("   You can also try http://127.0.0.1:{}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Handler for the main page
async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let template = IndexTemplate {
        audio_bitrate: state.relay.audio_target().bitrate_kbps,
    };

    Ok(Html(template.render()?))
}

async fn ping() -> &'static str {
    "Server is working!"
}

/// Handler listing the renditions of a video
async fn video_info(
    State(state): State<AppState>,
    query: Result<Query<VideoInfoQuery>, QueryRejection>,
) -> Result<Json<VideoInfoResponse>, AppError> {
    let Query(query) = query?;
    info!("Received video-info request: {:?}", query);

    let manifest = state.relay.list_renditions(query.url.as_deref()).await?;
    Ok(Json(VideoInfoResponse::from(&manifest)))
}

/// Handler streaming one rendition as an attachment
async fn download(
    State(state): State<AppState>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    info!("Download request received: {:?}", query);

    let download = state
        .relay
        .fetch_rendition(query.url.as_deref(), query.quality.as_deref(), query.is_audio)
        .await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(download.content_type()),
    );
    let disposition = HeaderValue::from_str(&download.content_disposition())
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    if let Some(length) = download.content_length() {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }

    info!("Streaming {}", download.filename);
    Ok((headers, Body::from_stream(download.stream)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::to_bytes;
    use axum::http::{Request, StatusCode};
    use bytes::Bytes;
    use futures::StreamExt;
    use media_protocol::{sanitize_title, SourceUrl};
    use media_relay::{Extractor, MediaStream, RelayError, Rendition, Transcoder, VideoManifest};
    use rstest::rstest;
    use serde_json::Value;
    use tower::ServiceExt;

    const URL: &str = "https%3A%2F%2Fwww.youtube.com%2Fwatch%3Fv%3DdQw4w9WgXcQ";

    fn rendition(selector: &str, quality: &str, has_video: bool, has_audio: bool) -> Rendition {
        Rendition {
            selector: selector.to_string(),
            quality: quality.to_string(),
            has_video,
            has_audio,
            container: "mp4".to_string(),
            mime_type: "video/mp4".to_string(),
            content_length: Some(6),
            fps: has_video.then_some(30),
        }
    }

    struct FixedExtractor {
        renditions: Vec<Rendition>,
    }

    #[async_trait]
    impl Extractor for FixedExtractor {
        async fn check_available(&self) -> Result<(), RelayError> {
            Ok(())
        }

        async fn fetch_manifest(&self, _source: &SourceUrl) -> Result<VideoManifest, RelayError> {
            Ok(VideoManifest {
                title: "Rick/Roll: \"Live\"".to_string(),
                renditions: self.renditions.clone(),
            })
        }

        async fn open_rendition(
            &self,
            _source: &SourceUrl,
            rendition: &Rendition,
        ) -> Result<MediaStream, RelayError> {
            let body = format!("{:>6}", rendition.selector);
            Ok(MediaStream::from_chunks(vec![Bytes::from(body)]))
        }

        async fn open_best_audio(&self, _source: &SourceUrl) -> Result<MediaStream, RelayError> {
            Ok(MediaStream::from_chunks(vec![Bytes::from_static(b"webm-audio")]))
        }
    }

    struct EchoTranscoder;

    #[async_trait]
    impl Transcoder for EchoTranscoder {
        async fn check_available(&self) -> Result<(), RelayError> {
            Ok(())
        }

        async fn transcode(
            &self,
            input: MediaStream,
            _target: &AudioTarget,
        ) -> Result<MediaStream, RelayError> {
            let prefixed = futures::stream::once(async { Ok(Bytes::from_static(b"ID3")) }).chain(input);
            Ok(MediaStream::new(prefixed, None))
        }
    }

    async fn app(renditions: Vec<Rendition>) -> Router {
        let relay = Relay::new(
            Arc::new(FixedExtractor { renditions }),
            Arc::new(EchoTranscoder),
            AudioTarget::mp3(192),
        )
        .await
        .unwrap();

        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            yt_dlp: "yt-dlp".into(),
            ffmpeg: "ffmpeg".into(),
            audio_bitrate: 192,
            static_dir: "static".into(),
        };
        router(AppState::new(relay), &config)
    }

    fn default_renditions() -> Vec<Rendition> {
        vec![
            rendition("137", "1080p", true, false),
            rendition("18", "360p", true, true),
            rendition("22", "720p", true, true),
            rendition("140", "medium", false, true),
        ]
    }

    async fn send_get(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Bytes {
        to_bytes(response.into_body(), usize::MAX).await.unwrap()
    }

    async fn json(response: Response) -> Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    #[tokio::test]
    async fn ping_answers_plain_text() {
        let response = send_get(app(default_renditions()).await, "/ping").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, "Server is working!");
    }

    #[tokio::test]
    async fn index_page_renders() {
        let response = send_get(app(default_renditions()).await, "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = String::from_utf8(body_bytes(response).await.to_vec()).unwrap();
        assert!(html.contains("id=\"videoUrl\""));
        assert!(html.contains("192 kbit/s"));
    }

    #[tokio::test]
    async fn static_script_is_served_with_title_rule() {
        let response = send_get(app(default_renditions()).await, "/static/app.js").await;
        assert_eq!(response.status(), StatusCode::OK);

        let script = String::from_utf8(body_bytes(response).await.to_vec()).unwrap();
        assert!(script.contains(r"replace(/[^\w\s]/g, '').split(/\s+/).filter(Boolean).join(' ')"));
        assert_eq!(sanitize_title("  Live\tat:  the Hall "), "Live at the Hall");
    }

    #[tokio::test]
    async fn video_info_lists_formats() {
        let response = send_get(
            app(default_renditions()).await,
            &format!("/video-info?url={}", URL),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert_eq!(body["title"], "Rick/Roll: \"Live\"");
        let formats = body["formats"].as_array().unwrap();
        assert_eq!(formats.len(), 4);
        assert_eq!(formats[1]["itag"], "18");
        assert_eq!(formats[1]["hasAudio"], true);
        assert_eq!(formats[3]["fps"], "N/A");
    }

    #[tokio::test]
    async fn video_info_without_url_is_bad_request() {
        let response = send_get(app(default_renditions()).await, "/video-info").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["error"], "Please provide a YouTube URL");
    }

    #[tokio::test]
    async fn video_info_with_foreign_host_is_bad_request() {
        let response = send_get(
            app(default_renditions()).await,
            "/video-info?url=https%3A%2F%2Fvimeo.com%2F1",
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["error"], "Please provide a valid YouTube URL");
    }

    #[tokio::test]
    async fn download_streams_selected_muxed_rendition() {
        let response = send_get(
            app(default_renditions()).await,
            &format!("/download?url={}&isAudio=false&quality=22", URL),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers().clone();
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"RickRoll Live.mp4\""
        );
        assert_eq!(headers[header::CONTENT_LENGTH], "6");
        assert_eq!(headers[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(body_bytes(response).await, "    22");
    }

    #[tokio::test]
    async fn download_with_unknown_quality_falls_back_to_first_muxed() {
        let response = send_get(
            app(default_renditions()).await,
            &format!("/download?url={}&quality=9999p", URL),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, "    18");
    }

    #[tokio::test]
    async fn audio_download_is_mp3_attachment() {
        let response = send_get(
            app(default_renditions()).await,
            &format!("/download?url={}&isAudio=true&quality=22", URL),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers().clone();
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"RickRoll Live.mp3\""
        );
        assert_eq!(headers[header::CONTENT_TYPE], "audio/mpeg");
        assert!(headers.get(header::CONTENT_LENGTH).is_none());
        assert_eq!(body_bytes(response).await, "ID3webm-audio");
    }

    #[tokio::test]
    async fn download_without_muxed_rendition_is_server_error() {
        let response = send_get(
            app(vec![
                rendition("137", "1080p", true, false),
                rendition("140", "medium", false, true),
            ])
            .await,
            &format!("/download?url={}", URL),
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json(response).await["error"], "No suitable format found");
    }

    #[rstest]
    #[case("1")]
    #[case("")]
    #[case("maybe")]
    #[tokio::test]
    async fn audio_flag_other_than_true_downloads_video(#[case] flag: &str) {
        let response = send_get(
            app(default_renditions()).await,
            &format!("/download?url={}&isAudio={}", URL, flag),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(body_bytes(response).await, "    18");
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let response = app(default_renditions())
            .await
            .oneshot(
                Request::builder()
                    .uri("/ping")
                    .header(header::ORIGIN, "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
