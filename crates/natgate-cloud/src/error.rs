//! Cloud provider error types

use std::time::Duration;
use thiserror::Error;

/// Error codes the remote API uses to report a missing NAT gateway.
pub const NOT_FOUND_CODES: &[&str] = &[
    "NatGatewayNotFound",
    "InvalidNatGatewayID.NotFound",
    "NotFound",
];

/// A failed Remote Client call, as reported by the provider.
///
/// `code` is the provider's machine-readable error identifier and is what
/// idempotency decisions match on. `transient` marks failures that may
/// succeed when repeated (network, throttling, provider-side 5xx).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub code: String,
    pub message: String,
    pub transient: bool,
}

impl RemoteError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            transient: false,
        }
    }

    pub fn transient(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            transient: true,
            ..Self::new(code, message)
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(NOT_FOUND_CODES[0], message)
    }

    pub fn is_not_found(&self) -> bool {
        NOT_FOUND_CODES.contains(&self.code.as_str())
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Cloud provider errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("API error: {0}")]
    Remote(RemoteError),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Timeout waiting for NAT gateway {id} after {timeout:?} (last state: {last_state})")]
    WaitTimeout {
        id: String,
        last_state: String,
        timeout: Duration,
    },

    #[error("NAT gateway {id} entered a failure state: {reason}")]
    WaitFailed { id: String, reason: String },

    #[error("Wait for NAT gateway {id} was cancelled")]
    WaitCancelled { id: String },

    #[error("NAT gateway {id} was created but is not ready: {source}")]
    Incomplete {
        id: String,
        #[source]
        source: Box<CloudError>,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// True when the remote API reported the object as missing.
    pub fn is_not_found(&self) -> bool {
        match self {
            CloudError::Remote(e) => e.is_not_found(),
            CloudError::NotFound(_) => true,
            _ => false,
        }
    }

    /// True for failures that a polling loop may retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, CloudError::Remote(e) if e.transient)
    }

    /// True when a wait was interrupted by the cancel signal.
    pub fn is_cancelled(&self) -> bool {
        match self {
            CloudError::WaitCancelled { .. } => true,
            CloudError::Incomplete { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// The remote id that was assigned before the operation failed, if any.
    pub fn tracked_id(&self) -> Option<&str> {
        match self {
            CloudError::Incomplete { id, .. } => Some(id),
            _ => None,
        }
    }
}

impl From<RemoteError> for CloudError {
    fn from(err: RemoteError) -> Self {
        CloudError::Remote(err)
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_codes() {
        for code in NOT_FOUND_CODES {
            assert!(CloudError::Remote(RemoteError::new(*code, "gone")).is_not_found());
        }
        assert!(!CloudError::Remote(RemoteError::new("InvalidSubnetID", "bad")).is_not_found());
    }

    #[test]
    fn test_transient_flag() {
        assert!(CloudError::from(RemoteError::transient("Throttling", "slow down")).is_transient());
        assert!(!CloudError::from(RemoteError::new("UnauthorizedOperation", "no")).is_transient());
        assert!(!CloudError::MalformedResponse("x".into()).is_transient());
    }

    #[test]
    fn test_incomplete_keeps_id() {
        let err = CloudError::Incomplete {
            id: "nat-1".into(),
            source: Box::new(CloudError::WaitCancelled { id: "nat-1".into() }),
        };
        assert_eq!(err.tracked_id(), Some("nat-1"));
        assert!(err.is_cancelled());
        assert_eq!(CloudError::NotFound("x".into()).tracked_id(), None);
        assert!(!CloudError::NotFound("x".into()).is_cancelled());
    }
}
