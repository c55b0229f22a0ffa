//! Relay between video page URLs and downloadable byte streams
//!
//! Extraction is delegated to `yt-dlp` and audio conversion to `ffmpeg`; both
//! sit behind traits so the relay logic can be exercised without them.

mod extractor;
mod relay;
mod stream;
mod transcoder;
mod types;

pub use extractor::{Extractor, YtDlp};
pub use relay::{select_muxed, Download, Relay};
pub use stream::MediaStream;
pub use transcoder::{Ffmpeg, Transcoder};
pub use types::{AudioTarget, RelayError, Rendition, VideoManifest};
