//! Session refresh flow: re-issue credentials for an established session.
//!
//! Same two-stage shape as the fetch flow, except the identity id is
//! already known, so identity resolution is skipped unconditionally:
//!
//! ```text
//! Start → ResolvingCredentials → Done
//!    │  (fast path: unexpired +     │
//!    │   unforced → Done directly)  │
//!    └── any failure ───────────→ Failed
//! ```
//!
//! An unforced refresh of credentials that have not expired is a no-op:
//! the held credentials come back unchanged without a network call.

use std::time::SystemTime;

use authflow_service::CredentialService;
use authflow_types::CredentialSet;
use tokio::sync::oneshot;

use crate::fetch::FlowCompletion;
use crate::{FlowError, RefreshContext, SessionResult};

/// Lifecycle states of the refresh flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Start,
    ResolvingCredentials,
    Done,
    Failed,
}

impl RefreshState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl std::fmt::Display for RefreshState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::ResolvingCredentials => "resolvingCredentials",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Spawns a refresh flow task and returns its completion channel.
pub fn spawn_refresh<S: CredentialService>(ctx: RefreshContext<S>) -> FlowCompletion {
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let flow = RefreshFlow {
            state: RefreshState::Start,
            ctx,
        };
        let _ = tx.send(flow.run().await);
    });

    rx
}

struct RefreshFlow<S: CredentialService> {
    state: RefreshState,
    ctx: RefreshContext<S>,
}

impl<S: CredentialService> RefreshFlow<S> {
    async fn run(mut self) -> Result<SessionResult, FlowError> {
        tracing::debug!(
            force_refresh = self.ctx.force_refresh,
            "refresh flow started"
        );

        let result = self.execute().await;
        match &result {
            Ok(_) => {
                self.state = RefreshState::Done;
                tracing::debug!("refresh flow finished");
            }
            Err(error) => {
                self.state = RefreshState::Failed;
                tracing::warn!(%error, "refresh flow failed");
            }
        }
        result
    }

    async fn execute(&mut self) -> Result<SessionResult, FlowError> {
        if !self.ctx.client_config.has_identity_pool() {
            tracing::debug!("no identity pool configured, nothing to refresh");
            return Ok(SessionResult::empty());
        }

        // Fast path: unforced refresh with credentials that are still
        // valid returns them unchanged, skipping the network entirely.
        if !self.ctx.force_refresh {
            if let Some(credentials) = &self.ctx.credentials {
                if !credentials.is_expired(SystemTime::now()) {
                    tracing::debug!("credentials still valid, skipping exchange");
                    return Ok(SessionResult {
                        identity_id: self.ctx.identity_id.take(),
                        credentials: Some(credentials.clone()),
                    });
                }
            }
        }

        let identity_id = self
            .ctx
            .identity_id
            .take()
            .ok_or(FlowError::MissingIdentity)?;

        self.state = RefreshState::ResolvingCredentials;
        let credentials = self.exchange(&identity_id).await?;

        Ok(SessionResult {
            identity_id: Some(identity_id),
            credentials: Some(credentials),
        })
    }

    /// Re-issues credentials: authenticated exchange when tokens were
    /// supplied, unauthenticated otherwise.
    async fn exchange(
        &self,
        identity_id: &authflow_types::IdentityId,
    ) -> Result<CredentialSet, FlowError> {
        match &self.ctx.user_pool_tokens {
            Some(tokens) => Ok(self
                .ctx
                .service
                .exchange_authenticated_credentials(identity_id, &tokens.id_token)
                .await?),
            None => Ok(self
                .ctx
                .service
                .exchange_unauthenticated_credentials(identity_id)
                .await?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_state_terminal_states() {
        assert!(!RefreshState::Start.is_terminal());
        assert!(!RefreshState::ResolvingCredentials.is_terminal());
        assert!(RefreshState::Done.is_terminal());
        assert!(RefreshState::Failed.is_terminal());
    }

    #[test]
    fn test_refresh_state_display() {
        assert_eq!(
            RefreshState::ResolvingCredentials.to_string(),
            "resolvingCredentials"
        );
        assert_eq!(RefreshState::Failed.to_string(), "failed");
    }
}
