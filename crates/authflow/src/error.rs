//! Unified error type for the orchestrator.

use authflow_flow::FlowError;
use authflow_types::ConfigError;

use crate::AuthorizationState;

/// Everything that can go wrong at the orchestration layer.
///
/// Flow and configuration errors wrap their sub-crate types, so the `?`
/// operator converts them automatically. Protocol violations — events
/// delivered in a state that does not accept them — are their own
/// variant and are reported back to the caller, never silently applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthFlowError {
    /// The supplied provider configuration failed validation.
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// An operation needed a service handle, but no configuration has
    /// been accepted yet (e.g. refresh after a cached-credential
    /// short-circuit that bypassed `configure`).
    #[error("no provider configuration has been accepted")]
    NotConfigured,

    /// An event was delivered in a state that does not accept it.
    #[error("event `{event}` is not valid in state `{state}`")]
    InvalidTransition {
        state: AuthorizationState,
        event: &'static str,
    },

    /// A sub-flow completed with an error. This is what the terminal
    /// error state retains as the causing error.
    #[error(transparent)]
    Flow(#[from] FlowError),

    /// The machine's task is gone (its handle outlived it).
    #[error("authorization machine is unavailable")]
    Unavailable,
}
