//! Error types for crawl requests.

use std::error::Error;
use std::fmt;

/// Errors that can occur while fetching a node's peer list.
#[derive(Debug)]
pub enum ClientError {
    /// The HTTP client could not be constructed.
    Build(reqwest::Error),
    /// The request failed in transport (connect, TLS, reset).
    Transport(reqwest::Error),
    /// The request did not complete within the configured timeout.
    Timeout,
    /// The request was abandoned before it produced a result.
    Aborted,
    /// The node answered with a non-success status.
    Status(u16),
    /// The body is missing or is not a crawl response.
    InvalidBody(serde_json::Error),
}

impl ClientError {
    /// Short, stable code for this error, suitable for recording per address.
    pub fn code(&self) -> String {
        match self {
            ClientError::Build(_) => "EBUILD".to_string(),
            ClientError::Transport(err) if err.is_connect() => "ECONNECT".to_string(),
            ClientError::Transport(_) => "ETRANSPORT".to_string(),
            ClientError::Timeout => "ETIMEDOUT".to_string(),
            ClientError::Aborted => "EABORTED".to_string(),
            ClientError::Status(status) => format!("HTTP{status}"),
            ClientError::InvalidBody(_) => "EBODY".to_string(),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Build(err) => write!(f, "Failed to build HTTP client: {err}"),
            ClientError::Transport(err) => write!(f, "Crawl request failed: {err}"),
            ClientError::Timeout => write!(f, "Crawl request timed out"),
            ClientError::Aborted => write!(f, "Crawl request aborted"),
            ClientError::Status(status) => write!(f, "Crawl endpoint returned status {status}"),
            ClientError::InvalidBody(err) => write!(f, "Invalid crawl response body: {err}"),
        }
    }
}

impl Error for ClientError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ClientError::Build(err) => Some(err),
            ClientError::Transport(err) => Some(err),
            ClientError::Timeout => None,
            ClientError::Aborted => None,
            ClientError::Status(_) => None,
            ClientError::InvalidBody(err) => Some(err),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Transport(err)
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::InvalidBody(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(ClientError::Timeout.code(), "ETIMEDOUT");
        assert_eq!(ClientError::Status(503).code(), "HTTP503");
        assert_eq!(ClientError::Aborted.code(), "EABORTED");
        let body_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(ClientError::from(body_err).code(), "EBODY");
    }
}
