use thiserror::Error;

/// Errors from the request-server API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (DNS, connect, timeout, TLS).
    #[error("{0}")]
    Transport(String),

    /// Non-2xx response with whatever message the server supplied.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),
}

impl ApiError {
    /// Flatten a reqwest error and its source chain into one message.
    /// reqwest's Display hides the underlying cause ("connection refused",
    /// "dns error", ...) behind nested sources; classification needs to see it.
    pub fn from_transport(err: reqwest::Error) -> Self {
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::Transport(message)
    }

    /// HTTP status for server-side errors, `None` for transport/parse ones.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::from_transport(err)
    }
}
