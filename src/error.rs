use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the client.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing credential or an invalid configuration value.
    #[error("configuration: {0}")]
    Configuration(String),

    /// Synchronous query failed at the transport or HTTP-status level.
    #[error("API request failed: {message}")]
    ApiRequest { status: Option<u16>, message: String },

    /// Streaming query failed before any event was delivered.
    #[error("streaming request failed: {message}")]
    StreamRequest { status: Option<u16>, message: String },

    /// The connection broke after the stream had started.
    #[error("stream interrupted: {0}")]
    Stream(#[source] reqwest::Error),

    /// No bytes arrived within the configured read timeout.
    #[error("stream idle for {0:?}")]
    StreamTimeout(Duration),
}

impl Error {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a synchronous request error.
    pub fn api_request(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::ApiRequest {
            status,
            message: message.into(),
        }
    }

    /// Create a stream initiation error.
    pub fn stream_request(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::StreamRequest {
            status,
            message: message.into(),
        }
    }

    /// HTTP status of the failed request, if the server answered at all.
    #[inline]
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::ApiRequest { status, .. } | Error::StreamRequest { status, .. } => *status,
            Error::Stream(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true for errors raised while building the client.
    #[inline]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    /// Returns true if the failure happened after streaming began.
    #[inline]
    pub fn is_mid_stream(&self) -> bool {
        matches!(self, Error::Stream(_) | Error::StreamTimeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_accessor() {
        assert_eq!(Error::api_request(Some(500), "boom").status(), Some(500));
        assert_eq!(Error::stream_request(None, "refused").status(), None);
        assert_eq!(Error::configuration("no key").status(), None);
    }

    #[test]
    fn test_display_carries_cause() {
        let err = Error::api_request(Some(401), "401 Unauthorized: invalid key");
        assert_eq!(
            err.to_string(),
            "API request failed: 401 Unauthorized: invalid key"
        );

        let err = Error::stream_request(None, "connection refused");
        assert_eq!(err.to_string(), "streaming request failed: connection refused");
    }

    #[test]
    fn test_classification() {
        assert!(Error::configuration("x").is_configuration());
        assert!(!Error::api_request(None, "x").is_configuration());
        assert!(Error::StreamTimeout(Duration::from_secs(1)).is_mid_stream());
        assert!(!Error::stream_request(None, "x").is_mid_stream());
    }
}
