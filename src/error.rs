//! Error types shared by the submission, verification and queue clients.

use crate::capture::{CameraError, LocationError};

/// A client-side validation failure attributable to one draft field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Permission or hardware failure reported by a capture device
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeviceError {
    #[error("camera: {0}")]
    Camera(#[from] CameraError),
    #[error("location: {0}")]
    Location(#[from] LocationError),
}

/// Errors from backend calls.
///
/// `Clone` so that callers coalesced onto one in-flight request all observe
/// the same outcome.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// Rejected before any network call.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    /// Transport failure, no response received.
    #[error("network error calling {endpoint}: {reason}")]
    Network { endpoint: String, reason: String },
    /// Non-2xx response or `success: false` envelope.
    #[error("{endpoint} failed ({status:?}): {message}")]
    Server {
        endpoint: String,
        status: Option<u16>,
        message: String,
    },
    /// 401 or 403; routed to re-authentication by the caller.
    #[error("{endpoint} rejected credentials ({status}): {message}")]
    Auth {
        endpoint: String,
        status: u16,
        message: String,
    },
    #[error("{endpoint} not found: {message}")]
    NotFound { endpoint: String, message: String },
    /// A status or visibility change for this property has not completed yet.
    #[error("a change to property {property_id} is already in progress")]
    MutationInFlight { property_id: String },
    #[error("failed to decode response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::Auth { .. })
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, ClientError::Auth { status: 403, .. })
    }

    /// Whether offering the user a retry makes sense
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Network { .. } | ClientError::Server { .. } | ClientError::Decode { .. }
        )
    }

    /// Field to highlight inline, for validation failures
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ClientError::Validation(e) => Some(e.field),
            _ => None,
        }
    }

    /// Message suitable for a banner
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(e) => e.message.clone(),
            ClientError::Server { message, .. }
            | ClientError::Auth { message, .. }
            | ClientError::NotFound { message, .. } => message.clone(),
            ClientError::Network { .. } => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}
