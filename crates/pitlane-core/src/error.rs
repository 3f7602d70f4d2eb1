//! Client error handling
//!
//! Typed errors for device API calls. Transport failures and
//! application-level refusals (`success: false`) are kept apart so callers
//! can decide how to surface each.

use thiserror::Error;

/// Generic message shown for anything that never reached the device
const NETWORK_USER_MESSAGE: &str = "Could not reach the controller. Check the connection.";

/// Errors that can occur while talking to the device
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// Request could not complete (connect, timeout, broken body)
    #[error("Request to '{endpoint}' failed: {details}")]
    Network { endpoint: String, details: String },

    /// Device answered with `success: false`
    #[error("Device rejected '{endpoint}': {message}")]
    Application { endpoint: String, message: String },

    /// Response was not the expected JSON envelope
    #[error("Invalid response from '{endpoint}': {details}")]
    Decode { endpoint: String, details: String },

    /// Racer name refused before sending
    #[error("Invalid racer name '{name}': {reason}")]
    InvalidRacerName { name: String, reason: &'static str },
}

impl ClientError {
    /// Check if this error means the device was unreachable
    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Network { .. })
    }

    /// Check if the device itself refused the request
    pub fn is_application(&self) -> bool {
        matches!(self, ClientError::Application { .. })
    }

    /// Whether this failure says anything about device liveness
    ///
    /// Local validation errors never reach the wire.
    pub fn affects_connection(&self) -> bool {
        !matches!(self, ClientError::InvalidRacerName { .. })
    }

    /// Text suitable for a user-facing notification
    ///
    /// Device messages are passed through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Network { .. } => NETWORK_USER_MESSAGE.to_string(),
            ClientError::Application { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Failure reported by a [`Transport`](crate::transport::Transport)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The request never produced a response
    #[error("{0}")]
    Unreachable(String),

    /// A response arrived but its body could not be read as JSON
    #[error("{0}")]
    Body(String),
}

impl TransportError {
    /// Attach the endpoint the request was for
    pub fn into_client_error(self, endpoint: &str) -> ClientError {
        match self {
            TransportError::Unreachable(details) => ClientError::Network {
                endpoint: endpoint.to_string(),
                details,
            },
            TransportError::Body(details) => ClientError::Decode {
                endpoint: endpoint.to_string(),
                details,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_error_has_generic_user_message() {
        let err = TransportError::Unreachable("connection refused".to_string())
            .into_client_error("/api/led/status");

        assert!(err.is_network());
        assert!(err.affects_connection());
        assert_eq!(err.user_message(), NETWORK_USER_MESSAGE);
        assert!(err.to_string().contains("/api/led/status"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_application_message_is_verbatim() {
        let err = ClientError::Application {
            endpoint: "/api/lap/increment".to_string(),
            message: "Carrera no iniciada".to_string(),
        };

        assert!(err.is_application());
        assert_eq!(err.user_message(), "Carrera no iniciada");
    }

    #[test]
    fn test_body_error_classification() {
        let err = TransportError::Body("expected value at line 1".to_string())
            .into_client_error("/api/lap/status");

        assert!(matches!(err, ClientError::Decode { .. }));
        assert!(!err.is_network());
        assert!(err.affects_connection());
    }

    #[test]
    fn test_validation_error_does_not_affect_connection() {
        let err = ClientError::InvalidRacerName {
            name: String::new(),
            reason: "name is empty",
        };

        assert!(!err.affects_connection());
        assert!(err.user_message().contains("name is empty"));
    }
}
