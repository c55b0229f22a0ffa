use bytes::Bytes;
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr};
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;

/// Byte stream of one rendition, with its exact length when known
pub struct MediaStream {
    inner: BoxStream<'static, io::Result<Bytes>>,
    content_length: Option<u64>,
}

impl MediaStream {
    pub fn new<S>(stream: S, content_length: Option<u64>) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: stream.boxed(),
            content_length,
        }
    }

    /// In-memory stream, mostly useful for stub extractors
    pub fn from_chunks(chunks: Vec<Bytes>) -> Self {
        let length = chunks.iter().map(|c| c.len() as u64).sum();
        Self::new(stream::iter(chunks.into_iter().map(Ok)), Some(length))
    }

    /// Stream the stdout of a child process
    ///
    /// The child is killed if the stream is dropped before it finishes. A
    /// non-zero exit status surfaces as a final error item carrying whatever
    /// the `diagnostics` task collected from stderr.
    pub fn from_child(
        mut child: Child,
        program: impl Into<String>,
        content_length: Option<u64>,
        diagnostics: Option<JoinHandle<String>>,
    ) -> io::Result<Self> {
        let program = program.into();
        let stdout = child.stdout.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, format!("{} stdout not captured", program))
        })?;

        let stream = async_stream::try_stream! {
            let mut chunks = ReaderStream::new(stdout);
            while let Some(chunk) = chunks.next().await {
                yield chunk?;
            }

            let status = child.wait().await?;
            if !status.success() {
                let detail = match diagnostics {
                    Some(handle) => handle.await.unwrap_or_default(),
                    None => String::new(),
                };
                Err::<(), io::Error>(io::Error::other(format!(
                    "{} exited with {}: {}",
                    program,
                    status,
                    detail.trim()
                )))?;
            }
        };

        Ok(Self::new(stream, content_length))
    }

    /// Surface a failure of the task feeding this stream's producer
    ///
    /// A producer such as ffmpeg treats a broken input as a normal end of
    /// input, so the feeder's result is checked once the output ends and a
    /// failed feed becomes the final error item.
    pub(crate) fn fed_by(self, feeder: JoinHandle<io::Result<u64>>) -> Self {
        let content_length = self.content_length;
        let mut inner = self.inner;

        let stream = async_stream::try_stream! {
            let mut failure = None;
            while let Some(item) = inner.next().await {
                match item {
                    Ok(chunk) => yield chunk,
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }

            let fed = feeder.await.map_err(io::Error::other)?;
            match (fed, failure) {
                (Err(upstream), Some(e)) => Err::<(), io::Error>(io::Error::other(format!(
                    "input stream failed: {}; {}",
                    upstream, e
                )))?,
                (Err(upstream), None) => Err::<(), io::Error>(io::Error::other(format!(
                    "input stream failed: {}",
                    upstream
                )))?,
                (Ok(_), Some(e)) => Err::<(), io::Error>(e)?,
                (Ok(_), None) => {}
            }
        };

        Self::new(stream, content_length)
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Wait for the first chunk so start-up failures surface before any
    /// byte is handed to the caller
    pub async fn primed(mut self) -> io::Result<Self> {
        match self.inner.next().await {
            Some(Ok(first)) => {
                let rest = self.inner;
                Ok(Self {
                    inner: stream::once(async move { Ok(first) }).chain(rest).boxed(),
                    content_length: self.content_length,
                })
            }
            Some(Err(e)) => Err(e),
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "no output was produced",
            )),
        }
    }

    /// Log relayed bytes against the declared length at `debug`
    pub fn with_progress_log(self, label: impl Into<String>) -> Self {
        let label = label.into();
        let total = self.content_length;
        let mut relayed: u64 = 0;
        let inner = self.inner.inspect(move |item| {
            if let Ok(chunk) = item {
                relayed += chunk.len() as u64;
                match total {
                    Some(total) if total > 0 => tracing::debug!(
                        "{}: relayed {}/{} bytes ({:.2}%)",
                        label,
                        relayed,
                        total,
                        relayed as f64 / total as f64 * 100.0
                    ),
                    _ => tracing::debug!("{}: relayed {} bytes", label, relayed),
                }
            }
        });
        Self {
            inner: inner.boxed(),
            content_length: total,
        }
    }
}

impl Stream for MediaStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Drain a child's stderr line by line
///
/// Every line goes through `on_line`; lines for which it returns `true` are
/// kept and joined into the task's output.
pub(crate) fn collect_stderr<F>(stderr: ChildStderr, mut on_line: F) -> JoinHandle<String>
where
    F: FnMut(&str) -> bool + Send + 'static,
{
    tokio::spawn(async move {
        let mut kept = Vec::new();
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if on_line(&line) {
                kept.push(line);
            }
        }
        kept.join("\n")
    })
}
