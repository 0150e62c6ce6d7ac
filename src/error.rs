//! Error types for the SGM workflow crate.
//!
//! This module defines the error taxonomy shared by the workflow engine,
//! the resource client and the controller, following the non-exhaustive
//! enum pattern so new variants can be added without breaking callers.

use std::fmt;

use thiserror::Error;

/// Why the engine refused a requested transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    /// The current state has no outgoing transitions.
    TerminalState,
    /// The target is not declared as a transition from the current state.
    NotOffered,
    /// The transition is declared but its guard does not hold for the context.
    GuardNotSatisfied,
    /// The current state or the target is not part of the definition.
    UnknownTarget,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::TerminalState => "current state is terminal",
            Self::NotOffered => "target is not reachable from current state",
            Self::GuardNotSatisfied => "transition is not allowed in this context",
            Self::UnknownTarget => "state is not part of the workflow",
        };
        f.write_str(text)
    }
}

/// The main error type for SGM workflow operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SgmError {
    /// A requested transition is not legal from the current state/context.
    #[error("Invalid transition for {entity}: {from} -> {to} ({reason})")]
    InvalidTransition {
        /// Entity type identifier.
        entity: &'static str,
        /// Current state label.
        from: String,
        /// Requested state or action label.
        to: String,
        /// Why the transition was refused.
        reason: RejectionReason,
    },

    /// A workflow definition violates one of its invariants.
    #[error("Invalid workflow definition: {0}")]
    InvalidDefinition(String),

    /// A status value received from the backend is not a known state.
    #[error("Unknown state for {entity}: {value}")]
    UnknownState {
        /// Entity type identifier.
        entity: &'static str,
        /// The unrecognised value.
        value: String,
    },

    /// The backend answered with a non-2xx status.
    #[error("Request failed with status {status}: {message}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The requested record or resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Another transition for the same record is still awaiting a response.
    #[error("A transition for {entity} {id} is already in flight")]
    TransitionInFlight {
        /// Entity type identifier.
        entity: &'static str,
        /// Record identifier.
        id: String,
    },

    /// The current user may not perform the action on the module.
    #[error("Permission denied: {action} on {module}")]
    PermissionDenied {
        /// Permission module name.
        module: String,
        /// Action name.
        action: String,
    },

    /// Form-level validation failure on create/update.
    #[error("Validation error on {field}: {message}")]
    Validation {
        /// Offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A `.env` file exists but could not be read or parsed.
    #[error("Environment file error: {0}")]
    EnvFile(#[from] dotenvy::Error),

    /// Tracing subscriber could not be installed.
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// Transport-level failure talking to the backend.
    #[cfg(feature = "http")]
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl SgmError {
    /// Returns true for errors the UI boundary should surface as a
    /// dismissible banner and keep going.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::RequestFailed { .. }
            | Self::NotFound(_)
            | Self::TransitionInFlight { .. }
            | Self::InvalidTransition { .. }
            | Self::PermissionDenied { .. }
            | Self::Validation { .. } => true,
            #[cfg(feature = "http")]
            Self::Network(_) => true,
            _ => false,
        }
    }
}

/// A specialized `Result` type for SGM workflow operations.
pub type Result<T> = std::result::Result<T, SgmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_transition() {
        let error = SgmError::InvalidTransition {
            entity: "chemical_analysis",
            from: "Completed".to_string(),
            to: "Received".to_string(),
            reason: RejectionReason::TerminalState,
        };
        assert_eq!(
            error.to_string(),
            "Invalid transition for chemical_analysis: Completed -> Received (current state is terminal)"
        );
    }

    #[test]
    fn test_error_display_request_failed() {
        let error = SgmError::RequestFailed {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(error.to_string(), "Request failed with status 500: boom");
    }

    #[test]
    fn test_error_display_in_flight() {
        let error = SgmError::TransitionInFlight {
            entity: "stock_movement",
            id: "7".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "A transition for stock_movement 7 is already in flight"
        );
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error: SgmError = json_error.into();
        assert!(error.to_string().contains("Serialization error"));
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(SgmError::NotFound("x".to_string()).is_recoverable());
        assert!(SgmError::RequestFailed {
            status: 400,
            message: String::new()
        }
        .is_recoverable());
        assert!(!SgmError::InvalidDefinition("bad".to_string()).is_recoverable());
    }

    #[test]
    fn test_rejection_reason_display() {
        assert_eq!(
            RejectionReason::GuardNotSatisfied.to_string(),
            "transition is not allowed in this context"
        );
    }
}
