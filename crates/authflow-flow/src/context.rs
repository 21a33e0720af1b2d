//! Spawn-time contexts and the completion payload shared by fetch/refresh.
//!
//! A context is a private snapshot: the parent builds it by value, hands it
//! to the spawned flow, and keeps nothing. The flow owns its context for
//! its whole lifetime, which is what makes the "no shared mutable state
//! between parent and child" rule hold without any locking.

use std::sync::Arc;

use authflow_service::SignUpRequest;
use authflow_types::{
    CredentialSet, IdentityId, ProviderConfig, SessionInfo, UserPoolTokens,
};

/// Spawn data for the session fetch flow.
pub struct FetchContext<S> {
    /// The provider configuration (read for the identity-pool policy).
    pub client_config: ProviderConfig,

    /// The shared service handle. `Arc` because the orchestrator keeps
    /// its own handle for subsequent flows.
    pub service: Arc<S>,

    /// A previously resolved identity id. When present, the flow skips
    /// identity resolution and goes straight to credential exchange.
    pub identity_id: Option<IdentityId>,

    /// Whether this fetch establishes an authenticated session.
    pub authenticated: bool,

    /// Tokens proving authenticated identity. Required when
    /// `authenticated` is `true`.
    pub user_pool_tokens: Option<UserPoolTokens>,
}

/// Spawn data for the session refresh flow.
///
/// Refresh is seeded from an already established session: the identity id
/// is known and identity resolution is skipped unconditionally.
pub struct RefreshContext<S> {
    pub client_config: ProviderConfig,
    pub service: Arc<S>,

    /// The established session's identity id.
    pub identity_id: Option<IdentityId>,

    /// The credentials currently held. Consulted by the unforced fast
    /// path: unexpired credentials are returned unchanged.
    pub credentials: Option<CredentialSet>,

    /// Tokens for an authenticated re-exchange. Absent means the
    /// unauthenticated exchange is used.
    pub user_pool_tokens: Option<UserPoolTokens>,

    /// `true` forces a credential exchange even if the held credentials
    /// have not expired.
    pub force_refresh: bool,
}

/// Spawn data for the sign-up flow.
pub struct SignUpContext<S> {
    pub service: Arc<S>,

    /// The provider configuration; `client_id` is what the registration
    /// and confirmation calls need.
    pub auth_config: ProviderConfig,

    /// The registration parameters, owned by the flow.
    pub request: SignUpRequest,
}

/// What a successful fetch or refresh produced.
///
/// Both fields are `None` when no identity pool is configured — the flow
/// completed, but there was nothing to resolve. The orchestrator turns
/// this into the authoritative [`SessionInfo`] by stamping the
/// `authenticated` flag; the flow itself never writes session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResult {
    pub identity_id: Option<IdentityId>,
    pub credentials: Option<CredentialSet>,
}

impl SessionResult {
    /// The result of a flow that had no identity pool to talk to.
    pub fn empty() -> Self {
        Self {
            identity_id: None,
            credentials: None,
        }
    }

    /// Stamps the result into a session record.
    pub fn into_session(self, authenticated: bool) -> SessionInfo {
        SessionInfo {
            identity_id: self.identity_id,
            credentials: self.credentials,
            authenticated,
        }
    }
}
