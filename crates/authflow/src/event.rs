//! Observable surface of the authorization machine: states, flow kinds,
//! lifecycle events, and the status snapshot.

use serde::{Deserialize, Serialize};

use authflow_types::SessionInfo;

use crate::AuthFlowError;

// ---------------------------------------------------------------------------
// AuthorizationState
// ---------------------------------------------------------------------------

/// The lifecycle state of the authorization machine.
///
/// ```text
/// notConfigured ──(configure)──→ configured
///       │                         │       │
///       │(cachedCredential        │       │(fetchUnAuthSession)
///       │ Available)              ▼       ▼
///       │                    signingIn   fetchingUnauthenticatedSession
///       │                     │     │               │
///       │      (signInCompleted)  (cancelSignIn)────┘
///       │             ▼                             │
///       │   fetchingAuthenticatedSession            │
///       │             │                             │
///       └─────────────┴──→ sessionEstablished ←─────┘
///                            │         │        │
///                   (signInRequested) (refreshSession → refreshingSession)
///                            │         │        │
///                            │   (signOutRequested → configured)
///                            ▼
///                       [ error ]  (terminal, reached from any flow failure)
/// ```
///
/// Callers only ever observe a settled session (`sessionEstablished` with
/// populated session info) or the terminal `error` with the causing
/// error — no partial state is exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthorizationState {
    NotConfigured,
    Configured,
    SigningIn,
    FetchingAuthenticatedSession,
    FetchingUnauthenticatedSession,
    RefreshingSession,
    SessionEstablished,
    Error,
}

impl AuthorizationState {
    /// Returns `true` for the terminal error state. No event except a
    /// status query is accepted once the machine is here.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Returns `true` while a fetch or refresh flow is in flight.
    ///
    /// At most one such flow exists at a time; every event that would
    /// spawn another is rejected while this holds.
    pub fn is_flow_active(&self) -> bool {
        matches!(
            self,
            Self::FetchingAuthenticatedSession
                | Self::FetchingUnauthenticatedSession
                | Self::RefreshingSession
        )
    }
}

impl std::fmt::Display for AuthorizationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NotConfigured => "notConfigured",
            Self::Configured => "configured",
            Self::SigningIn => "signingIn",
            Self::FetchingAuthenticatedSession => "fetchingAuthenticatedSession",
            Self::FetchingUnauthenticatedSession => "fetchingUnauthenticatedSession",
            Self::RefreshingSession => "refreshingSession",
            Self::SessionEstablished => "sessionEstablished",
            Self::Error => "error",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// FlowKind
// ---------------------------------------------------------------------------

/// Which kind of sub-flow the orchestrator spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlowKind {
    Fetch,
    Refresh,
}

impl std::fmt::Display for FlowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}

// ---------------------------------------------------------------------------
// LifecycleEvent
// ---------------------------------------------------------------------------

/// Structured lifecycle notifications for external observers.
///
/// The machine's transition logic performs no observability side effects
/// itself; it emits these events to an optional observer channel, and the
/// observer decides what to log, count, or display. Dropping the receiver
/// just stops the notifications — the machine is unaffected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The machine moved between states.
    StateChanged {
        from: AuthorizationState,
        to: AuthorizationState,
    },
    /// A sub-flow was spawned.
    FlowSpawned { kind: FlowKind },
    /// A sub-flow reported its completion (and whether it succeeded).
    FlowCompleted { kind: FlowKind, success: bool },
    /// The authoritative session was replaced wholesale.
    SessionReplaced { authenticated: bool },
    /// The session was cleared on sign-out.
    SessionCleared,
}

// ---------------------------------------------------------------------------
// StatusSnapshot
// ---------------------------------------------------------------------------

/// A point-in-time view of the machine, returned by status queries.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    /// Current state name.
    pub state: AuthorizationState,
    /// The established session, when `state` is `SessionEstablished`
    /// (or the cached one right after `cached_credentials_available`).
    pub session: Option<SessionInfo>,
    /// The causing error, when `state` is the terminal `Error`.
    pub error: Option<AuthFlowError>,
}
