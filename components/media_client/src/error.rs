use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),

    #[error("Connection error: {0}")]
    Connection(String),

    /// Error message reported by the relay
    #[error("{0}")]
    Server(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("{0}")]
    InvalidState(&'static str),
}

impl ClientError {
    /// Network-type failures flip the connectivity indicator
    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Connection(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Protocol(err.to_string())
        } else {
            ClientError::Connection(err.to_string())
        }
    }
}

impl From<media_protocol::ProtocolError> for ClientError {
    fn from(err: media_protocol::ProtocolError) -> Self {
        ClientError::Validation(err.to_string())
    }
}
