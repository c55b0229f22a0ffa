use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Please provide a YouTube URL")]
    MissingUrl,

    #[error("Please provide a valid YouTube URL")]
    UnrecognizedHost(String),

    #[error("Could not extract video ID from URL")]
    MissingVideoId(String),
}
