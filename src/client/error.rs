use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// The backend answered with its error envelope.
    #[error("{message}")]
    Remote { code: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid identity token: {0}")]
    Token(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub fn remote(code: impl Into<String>, message: impl Into<String>) -> Self {
        ClientError::Remote {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Error code of a backend reply, if this came from one.
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Remote { code, .. } => Some(code),
            _ => None,
        }
    }
}
