//! Error types for the discovery engine.

use thiserror::Error;

/// Errors surfaced by discovery queries and stanza helpers.
#[derive(Debug, Error)]
pub enum DiscoError {
    /// The transport failed to complete a discovery request.
    #[error("Discovery request failed: {0}")]
    Request(#[from] RequestError),

    /// A stanza or element did not have the expected disco shape.
    #[error("Malformed discovery payload: {0}")]
    Malformed(String),
}

impl DiscoError {
    /// Create a new malformed-payload error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

/// Errors a transport reports for a single discovery request.
///
/// These cover the request/response boundary only. Cache state is never
/// mutated on any of them; probe resolution treats them all the same way
/// (advance to the next candidate).
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    /// No response arrived in time.
    #[error("Request timed out")]
    Timeout,

    /// The peer answered with an error stanza.
    #[error("Peer returned an error: {condition}")]
    Peer {
        /// Defined error condition from the error stanza
        condition: String,
    },

    /// The underlying connection could not carry the request.
    #[error("Connection unavailable: {0}")]
    Connection(String),

    /// The response arrived but could not be parsed.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl RequestError {
    /// Create a peer-error value from a stanza error condition.
    pub fn peer(condition: impl Into<String>) -> Self {
        Self::Peer {
            condition: condition.into(),
        }
    }

    /// Create a connection-unavailable error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a malformed-response error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_error_display() {
        let err = RequestError::peer("item-not-found");
        assert_eq!(err.to_string(), "Peer returned an error: item-not-found");
    }

    #[test]
    fn test_disco_error_from_request_error() {
        let err: DiscoError = RequestError::Timeout.into();
        assert!(matches!(err, DiscoError::Request(RequestError::Timeout)));
    }
}
