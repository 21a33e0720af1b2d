//! Session fetch flow: resolve an identity id, then exchange it for
//! temporary credentials.
//!
//! The flow runs in its own Tokio task and moves through a strict sequence:
//!
//! ```text
//! Start → ResolvingIdentity → ResolvingCredentials → Done
//!            (skipped if an identity id was seeded)      │
//!                         any failure ──────────────→ Failed
//! ```
//!
//! Identity resolution always precedes credential exchange — credentials
//! are never requested without a resolved identity id. The flow never
//! retries; any failure is reported once through the completion channel.

use authflow_service::CredentialService;
use authflow_types::{CredentialSet, IdentityId};
use tokio::sync::oneshot;

use crate::{FetchContext, FlowError, SessionResult};

/// Completion channel for fetch and refresh flows.
///
/// The receiving side is the only link between the parent and a running
/// flow. Dropping it detaches the parent — the flow still runs to
/// completion, but nobody hears the result (this is how a canceled
/// sign-in "stops listening").
pub type FlowCompletion = oneshot::Receiver<Result<SessionResult, FlowError>>;

/// Lifecycle states of the fetch flow.
///
/// Transitions are strictly ordered; `ResolvingIdentity` is skipped when
/// the spawn context already carries an identity id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Start,
    ResolvingIdentity,
    ResolvingCredentials,
    Done,
    Failed,
}

impl FetchState {
    /// Returns `true` once the flow has reported its completion.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl std::fmt::Display for FetchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::ResolvingIdentity => "resolvingIdentity",
            Self::ResolvingCredentials => "resolvingCredentials",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Spawns a fetch flow task and returns its completion channel.
pub fn spawn_fetch<S: CredentialService>(ctx: FetchContext<S>) -> FlowCompletion {
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let flow = FetchFlow {
            state: FetchState::Start,
            ctx,
        };
        // The receiver may already be gone (parent stopped listening);
        // the result is simply dropped in that case.
        let _ = tx.send(flow.run().await);
    });

    rx
}

/// The flow task's internal state. Lives inside the spawned task.
struct FetchFlow<S: CredentialService> {
    state: FetchState,
    ctx: FetchContext<S>,
}

impl<S: CredentialService> FetchFlow<S> {
    async fn run(mut self) -> Result<SessionResult, FlowError> {
        tracing::debug!(
            authenticated = self.ctx.authenticated,
            "fetch flow started"
        );

        let result = self.execute().await;
        match &result {
            Ok(session) => {
                self.state = FetchState::Done;
                tracing::debug!(
                    identity_id = session
                        .identity_id
                        .as_ref()
                        .map(|id| id.0.as_str())
                        .unwrap_or("<none>"),
                    "fetch flow finished"
                );
            }
            Err(error) => {
                self.state = FetchState::Failed;
                tracing::warn!(%error, state = %self.state, "fetch flow failed");
            }
        }
        result
    }

    async fn execute(&mut self) -> Result<SessionResult, FlowError> {
        // No identity pool means there is nothing to resolve: complete
        // with an empty result without touching the network at all.
        if !self.ctx.client_config.has_identity_pool() {
            tracing::debug!("no identity pool configured, nothing to fetch");
            return Ok(SessionResult::empty());
        }

        let identity_id = match self.ctx.identity_id.take() {
            // A seeded identity id skips resolution entirely.
            Some(id) => id,
            None => {
                self.state = FetchState::ResolvingIdentity;
                self.resolve_identity().await?
            }
        };

        self.state = FetchState::ResolvingCredentials;
        let credentials = self.resolve_credentials(&identity_id).await?;

        Ok(SessionResult {
            identity_id: Some(identity_id),
            credentials: Some(credentials),
        })
    }

    async fn resolve_identity(&self) -> Result<IdentityId, FlowError> {
        if self.ctx.authenticated {
            let tokens = self
                .ctx
                .user_pool_tokens
                .as_ref()
                .ok_or(FlowError::MissingTokens)?;
            Ok(self
                .ctx
                .service
                .resolve_authenticated_identity(&tokens.id_token)
                .await?)
        } else {
            Ok(self.ctx.service.resolve_unauthenticated_identity().await?)
        }
    }

    async fn resolve_credentials(
        &self,
        identity_id: &IdentityId,
    ) -> Result<CredentialSet, FlowError> {
        if self.ctx.authenticated {
            let tokens = self
                .ctx
                .user_pool_tokens
                .as_ref()
                .ok_or(FlowError::MissingTokens)?;
            Ok(self
                .ctx
                .service
                .exchange_authenticated_credentials(identity_id, &tokens.id_token)
                .await?)
        } else {
            Ok(self
                .ctx
                .service
                .exchange_unauthenticated_credentials(identity_id)
                .await?)
        }
    }
}
