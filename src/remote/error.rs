use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("authentication failed: {detail}")]
    AuthenticationFailed { detail: String },

    #[error("second factor code was rejected")]
    SecondFactorRejected,

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("service error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("malformed asset record: {detail}")]
    EnumerationItem { detail: String },

    #[error("failed to download {filename}: {detail}")]
    DownloadFailed { filename: String, detail: String },

    #[error("unexpected status {status} from {context}")]
    Status { status: u16, context: String },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to parse response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl RemoteError {
    /// Whether a retry has any chance of succeeding. Rate limits and server
    /// errors do; everything else is permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Status { status, .. } => *status == 429 || *status >= 500,
            RemoteError::Http(e) => {
                if e.is_timeout() || e.is_connect() {
                    return true;
                }
                match e.status() {
                    Some(status) => status.as_u16() == 429 || status.is_server_error(),
                    None => false,
                }
            }
            _ => false,
        }
    }
}
