//! Failure taxonomy for requests and tunnel sessions.
//!
//! Every variant is handled at the boundary of the request or session that
//! produced it. [`GatewayError::status`] says what, if anything, the client
//! should still be told.

use std::io;

use crate::http::response::{Response, StatusCode};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The route's backend address cannot be used.
    #[error("invalid backend address {address:?}: {reason}")]
    InvalidTarget { address: String, reason: String },

    /// Dialing the backend failed or hit the connect deadline.
    #[error("backend {address} unreachable: {source}")]
    BackendUnreachable {
        address: String,
        #[source]
        source: io::Error,
    },

    /// The backend answered with something that is not HTTP.
    #[error("malformed response from backend: {0}")]
    BackendProtocol(String),

    /// Reading from or writing to an established backend connection failed.
    #[error("backend i/o failed: {0}")]
    BackendIo(#[source] io::Error),

    /// The client sent a body the gateway cannot follow.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// A tunnel-only path was requested without the upgrade handshake.
    #[error("not a websocket upgrade request")]
    NotAnUpgrade,

    /// The client side failed; nothing more can be sent to it.
    #[error("client i/o failed: {0}")]
    ClientIo(#[source] io::Error),
}

impl GatewayError {
    /// Status to answer the client with, or `None` when the client
    /// connection is already unusable.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            GatewayError::InvalidTarget { .. } => Some(StatusCode::InternalServerError),
            GatewayError::BackendUnreachable { .. }
            | GatewayError::BackendProtocol(_)
            | GatewayError::BackendIo(_) => Some(StatusCode::BadGateway),
            GatewayError::MalformedRequest(_) | GatewayError::NotAnUpgrade => {
                Some(StatusCode::BadRequest)
            }
            GatewayError::ClientIo(_) => None,
        }
    }

    /// The response matching [`GatewayError::status`].
    pub fn to_response(&self) -> Option<Response> {
        let status = self.status()?;
        let message = match self {
            GatewayError::InvalidTarget { .. } => "Bad target URL",
            GatewayError::NotAnUpgrade => "Not a WebSocket request",
            GatewayError::MalformedRequest(_) => "Malformed request",
            _ => "Backend service unavailable",
        };
        Some(Response::text(status, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        let unreachable = GatewayError::BackendUnreachable {
            address: "localhost:1".into(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        assert_eq!(unreachable.status(), Some(StatusCode::BadGateway));

        let invalid = GatewayError::InvalidTarget {
            address: "::".into(),
            reason: "bad".into(),
        };
        assert_eq!(invalid.status(), Some(StatusCode::InternalServerError));

        assert_eq!(GatewayError::NotAnUpgrade.status(), Some(StatusCode::BadRequest));

        let client = GatewayError::ClientIo(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(client.to_response().is_none());
    }
}
