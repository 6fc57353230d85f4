use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Failures talking to the authorizer
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("http error response. status: {status}. body: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected JSON schema: {0}")]
    UnexpectedSchema(String),

    #[error("deadline exceeded before the authorizer answered")]
    DeadlineExceeded,

    #[error("invalid client configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub fn is_deadline(&self) -> bool {
        match self {
            ClientError::DeadlineExceeded => true,
            ClientError::Http(err) => err.is_timeout(),
            _ => false,
        }
    }
}
