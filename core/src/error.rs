//! Error types for the Service Layer connector.
//!
//! # Design
//! Login failures are expected outcomes: they are captured as
//! `Connectivity` or `Authentication` and surfaced through
//! `ServiceLayerConnector::login_error_msg` rather than returned. Failed data
//! calls are returned to the caller as `Remote` with the message the server
//! put in `error.message.value` and the HTTP status.

use thiserror::Error;

/// Fixed status reported when the login request got no response at all.
pub const CONNECTIVITY_STATUS: u16 = 400;

/// The transport produced no HTTP response (DNS, refused connection, TLS,
/// timeout, unreadable body).
#[derive(Debug, Error)]
#[error("transport failure: {0}")]
pub struct TransportError(pub String);

/// Errors produced by `ServiceLayerConnector`.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The login request never reached the service layer.
    #[error("can't connect with the service layer")]
    Connectivity { reason: String },

    /// The service layer rejected the login, or accepted it without issuing
    /// a session token. The message is surfaced verbatim.
    #[error("{message}")]
    Authentication { message: String, status: u16 },

    /// A data call returned a status outside 2xx.
    #[error("HTTP {status}: {message}")]
    Remote { message: String, status: u16 },

    /// Raw mode was requested but the reported header size does not fit
    /// inside the received payload.
    #[error("header size {header_size} exceeds response length {len}")]
    MalformedResponse { header_size: usize, len: usize },

    /// A 2xx body could not be decoded as JSON.
    #[error("deserialization failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// A request payload could not be encoded as JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// A data call got no response from the transport.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ConnectorError {
    /// HTTP-like status associated with the error, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ConnectorError::Connectivity { .. } => Some(CONNECTIVITY_STATUS),
            ConnectorError::Authentication { status, .. }
            | ConnectorError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors raised while loading `ConnectionParams` from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_displays_message_only() {
        let err = ConnectorError::Authentication {
            message: "Invalid credentials".to_string(),
            status: 401,
        };
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn connectivity_reports_fixed_status() {
        let err = ConnectorError::Connectivity {
            reason: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "can't connect with the service layer");
        assert_eq!(err.status(), Some(CONNECTIVITY_STATUS));
    }

    #[test]
    fn transport_error_has_no_status() {
        let err = ConnectorError::from(TransportError("timed out".to_string()));
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "transport failure: timed out");
    }
}
