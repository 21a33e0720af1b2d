//! Error types for the flow layer.

use authflow_service::ServiceError;

/// Errors a flow can complete with.
///
/// Flows never retry: every failure is reported exactly once to the
/// invoker through the completion channel, and the invoker decides what
/// happens next (for the orchestrator: transition to its terminal error
/// state).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    /// A service call failed. Wraps the provider client's error
    /// transparently, so `to_string()` reads like the underlying failure.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// An authenticated flow was spawned without user-pool tokens.
    /// The id-token is what proves authenticated identity, so this is a
    /// caller protocol violation, not a provider failure.
    #[error("authenticated flow spawned without user pool tokens")]
    MissingTokens,

    /// A refresh flow was spawned without the identity id it is supposed
    /// to reuse.
    #[error("refresh flow spawned without an identity id")]
    MissingIdentity,

    /// The sign-up flow was waiting for a confirmation code, but every
    /// handle to it was dropped before one arrived.
    #[error("sign-up abandoned while awaiting a confirmation code")]
    ConfirmationAbandoned,

    /// The flow's command channel is closed — it already finished.
    #[error("flow is no longer running")]
    Unavailable,
}
