//! Error types for the service layer.

/// Errors reported by a [`CredentialService`](crate::CredentialService)
/// implementation.
///
/// Two kinds are distinguished because callers react differently:
/// a [`Network`](ServiceError::Network) failure means the call never
/// produced an answer, while a [`Validation`](ServiceError::Validation)
/// failure means the provider answered and said no.
///
/// `Clone` is derived because service errors travel through flow
/// completion channels and end up retained in the orchestrator's terminal
/// error state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The call failed at the transport or service level (timeout, DNS,
    /// 5xx, throttling). `operation` names the service call that failed
    /// so the error is diagnosable without a stack trace.
    #[error("network failure during {operation}: {message}")]
    Network {
        operation: &'static str,
        message: String,
    },

    /// The provider rejected the request (bad parameters, unknown user,
    /// wrong confirmation code, password policy).
    #[error("request rejected by provider: {0}")]
    Validation(String),
}

impl ServiceError {
    /// Shorthand for a [`ServiceError::Network`] error.
    pub fn network(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Network {
            operation,
            message: message.into(),
        }
    }
}
