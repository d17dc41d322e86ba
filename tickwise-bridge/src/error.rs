//! Error types for the tickwise bridge.
//!
//! [`HostError`] is what host bindings report. [`BridgeError`] is what the
//! lifecycle controller returns to the host when a required step fails.
//! Capability absence is never an error: it is represented by
//! [`crate::selector::Resolved::Absent`].

use thiserror::Error;
use tickwise_core::CoreError;

use crate::lifecycle::LifecycleState;

/// Failures reported by a host binding.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Host feature '{0}' is not available")]
    FeatureUnavailable(String),

    #[error("Registration of '{what}' failed: {reason}")]
    Registration { what: String, reason: String },

    #[error("Host query '{query}' failed: {reason}")]
    Query { query: String, reason: String },

    #[error("Command map operation on '{label}' failed: {reason}")]
    CommandMap { label: String, reason: String },
}

impl HostError {
    pub fn query(query: impl Into<String>, reason: impl Into<String>) -> Self {
        HostError::Query {
            query: query.into(),
            reason: reason.into(),
        }
    }

    pub fn registration(what: impl Into<String>, reason: impl Into<String>) -> Self {
        HostError::Registration {
            what: what.into(),
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the lifecycle controller.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Cannot {operation} while the bridge is {state}")]
    InvalidState {
        operation: &'static str,
        state: LifecycleState,
    },

    #[error("Profiling engine construction failed: {0}")]
    EngineConstruction(String),

    #[error("Profiling engine failed to start: {0}")]
    EngineStartup(String),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_error_helpers() {
        let err = HostError::query("worlds", "server stopping");
        assert_eq!(err.to_string(), "Host query 'worlds' failed: server stopping");

        let err = HostError::registration("PlaceholderAPI", "class mismatch");
        assert!(matches!(err, HostError::Registration { .. }));
    }

    #[test]
    fn test_bridge_error_invalid_state_display() {
        let err = BridgeError::InvalidState {
            operation: "enable",
            state: LifecycleState::Disabled,
        };
        assert_eq!(err.to_string(), "Cannot enable while the bridge is disabled");
    }

    #[test]
    fn test_bridge_error_from_host_error_is_transparent() {
        let err: BridgeError = HostError::FeatureUnavailable("tick-events".to_string()).into();
        assert_eq!(err.to_string(), "Host feature 'tick-events' is not available");
    }
}
