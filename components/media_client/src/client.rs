use crate::error::ClientError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use media_protocol::{DownloadQuery, ErrorBody, SourceUrl, VideoInfoQuery, VideoInfoResponse};
use reqwest::header::CONTENT_DISPOSITION;
use url::Url;

/// Response body of a download, read chunk by chunk
pub struct Transfer {
    pub content_length: Option<u64>,
    /// Filename announced in `Content-Disposition`
    pub filename: Option<String>,
    pub body: BoxStream<'static, Result<Bytes, ClientError>>,
}

/// The two operations of the relay service
#[async_trait]
pub trait RelayApi: Send + Sync {
    async fn video_info(&self, source: &SourceUrl) -> Result<VideoInfoResponse, ClientError>;

    async fn download(&self, query: &DownloadQuery) -> Result<Transfer, ClientError>;
}

/// HTTP client of a running relay server
pub struct RelayClient {
    http: reqwest::Client,
    base: Url,
}

impl RelayClient {
    pub fn connect(base: &str) -> Result<Self, ClientError> {
        let base = Url::parse(base).map_err(|e| ClientError::Connection(format!("{}: {}", base, e)))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|e| ClientError::Connection(e.to_string()))
    }

    /// Turn a non-success response into the relay's error message
    async fn check(response: reqwest::Response, fallback: &str) -> Result<reqwest::Response, ClientError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => format!("{} ({})", fallback, status),
        };
        Err(ClientError::Server(message))
    }
}

#[async_trait]
impl RelayApi for RelayClient {
    async fn video_info(&self, source: &SourceUrl) -> Result<VideoInfoResponse, ClientError> {
        let query = VideoInfoQuery {
            url: Some(source.as_str().to_string()),
        };
        let response = self
            .http
            .get(self.endpoint("video-info")?)
            .query(&query)
            .send()
            .await?;

        let response = Self::check(response, "Failed to fetch video information").await?;
        Ok(response.json().await?)
    }

    async fn download(&self, query: &DownloadQuery) -> Result<Transfer, ClientError> {
        let response = self
            .http
            .get(self.endpoint("download")?)
            .query(query)
            .send()
            .await?;

        let response = Self::check(response, "Download failed").await?;
        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(disposition_filename);

        Ok(Transfer {
            content_length: response.content_length(),
            filename,
            body: response.bytes_stream().map_err(ClientError::from).boxed(),
        })
    }
}

/// Extract the quoted filename of an `attachment` disposition
pub fn disposition_filename(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}
