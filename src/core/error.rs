/// Errors raised while talking to the metrics backend

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashError {
    #[error("request for `{query}` failed: {source}")]
    Http {
        query: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("query `{query}` returned HTTP {status}")]
    Status { query: String, status: u16 },

    #[error("query `{query}` was rejected by the backend: {message}")]
    Backend { query: String, message: String },

    #[error("response for `{query}` could not be decoded: {message}")]
    Decode { query: String, message: String },

    #[error("invalid base URL `{0}`")]
    InvalidBaseUrl(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl DashError {
    /// The query expression the error belongs to, when there is one
    pub fn query(&self) -> Option<&str> {
        match self {
            DashError::Http { query, .. }
            | DashError::Status { query, .. }
            | DashError::Backend { query, .. }
            | DashError::Decode { query, .. } => Some(query.as_str()),
            DashError::InvalidBaseUrl(_) | DashError::Client(_) => None,
        }
    }
}
