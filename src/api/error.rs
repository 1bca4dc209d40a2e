use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid api url: {0}")]
    Url(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("http {status}: {body}")]
    Status { status: u16, body: String },

    #[error("api rejected request ({status:?}): {message}")]
    Rejected {
        status: Option<u16>,
        message: String,
    },

    #[error("response carried no data")]
    MissingData,
}

impl ApiError {
    /// Token missing, expired or revoked; the caller has to sign in again.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => *status == 401,
            ApiError::Rejected { status, .. } => *status == Some(401),
            _ => false,
        }
    }
}
