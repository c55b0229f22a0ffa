mod error;
mod filename;
mod protocol;
mod source;

pub use error::ProtocolError;
pub use filename::{attachment_filename, sanitize_title};
pub use protocol::{
    DownloadQuery, ErrorBody, FormatEntry, FrameRate, OutputKind, VideoInfoQuery,
    VideoInfoResponse,
};
pub use source::SourceUrl;
