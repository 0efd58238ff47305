use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server error {status}: {error_code}")]
    Server {
        status: StatusCode,
        error_code: String,
        details: Option<String>,
    },

    #[error("authentication rejected by the server")]
    Unauthorized,

    #[error("client is not authenticated; bootstrap first")]
    NotAuthenticated,

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized)
    }

    pub fn error_code(&self) -> Option<&str> {
        match self {
            ClientError::Server { error_code, .. } => Some(error_code),
            _ => None,
        }
    }
}
