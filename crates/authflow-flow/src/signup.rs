//! Sign-up flow: registration plus an optional confirmation-code step.
//!
//! Unlike fetch and refresh, this flow can pause mid-way: when the
//! provider reports `user_confirmed == false`, the flow parks in
//! `ConfirmationPending` and waits for a confirmation code delivered from
//! outside (the user reads it from their email or phone). That makes it a
//! proper actor with a command channel, not just a task:
//!
//! ```text
//! Start → Submitting ──(user_confirmed)──────────────→ Done
//!             │(needs confirmation)                      ▲
//!             ▼                                          │
//!       ConfirmationPending ──(code)──→ Confirming ──────┘
//!             │                             │
//!             └──── any failure ──────→ Failed
//! ```
//!
//! The sign-up flow is independent of the orchestrator's session
//! lifecycle — it never reads or writes `SessionInfo`.

use authflow_service::{CredentialService, SignUpResponse};
use tokio::sync::{mpsc, oneshot};

use crate::{FlowError, SignUpContext};

/// Commands sent to a running sign-up flow.
enum SignUpCommand {
    /// The confirmation code the user received.
    ConfirmSignUp { code: String },
}

/// Completion channel for the sign-up flow. Resolves exactly once, with
/// the provider's registration response or the captured error.
pub type SignUpCompletion = oneshot::Receiver<Result<SignUpResponse, FlowError>>;

/// Lifecycle states of the sign-up flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignUpState {
    Start,
    Submitting,
    ConfirmationPending,
    Confirming,
    Done,
    Failed,
}

impl SignUpState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl std::fmt::Display for SignUpState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Submitting => "submitting",
            Self::ConfirmationPending => "confirmationPending",
            Self::Confirming => "confirming",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Handle to a running sign-up flow.
///
/// Cheap to clone — it wraps an `mpsc::Sender`. Dropping every handle
/// while the flow waits for a code fails the flow with
/// [`FlowError::ConfirmationAbandoned`].
#[derive(Clone)]
pub struct SignUpHandle {
    sender: mpsc::Sender<SignUpCommand>,
}

impl SignUpHandle {
    /// Delivers the confirmation code the user received.
    ///
    /// # Errors
    /// Returns [`FlowError::Unavailable`] if the flow already finished
    /// (confirmed, failed, or was never waiting for a code).
    pub async fn confirm_sign_up(&self, code: impl Into<String>) -> Result<(), FlowError> {
        self.sender
            .send(SignUpCommand::ConfirmSignUp { code: code.into() })
            .await
            .map_err(|_| FlowError::Unavailable)
    }
}

/// Spawns a sign-up flow task.
///
/// Returns the command handle and the one-shot completion channel. The
/// completion resolves as soon as registration finishes when no
/// confirmation is needed, or after the confirmation step otherwise.
pub fn spawn_sign_up<S: CredentialService>(
    ctx: SignUpContext<S>,
) -> (SignUpHandle, SignUpCompletion) {
    let (cmd_tx, cmd_rx) = mpsc::channel(4);
    let (done_tx, done_rx) = oneshot::channel();

    tokio::spawn(async move {
        let flow = SignUpFlow {
            state: SignUpState::Start,
            ctx,
            receiver: cmd_rx,
        };
        let _ = done_tx.send(flow.run().await);
    });

    (SignUpHandle { sender: cmd_tx }, done_rx)
}

struct SignUpFlow<S: CredentialService> {
    state: SignUpState,
    ctx: SignUpContext<S>,
    receiver: mpsc::Receiver<SignUpCommand>,
}

impl<S: CredentialService> SignUpFlow<S> {
    async fn run(mut self) -> Result<SignUpResponse, FlowError> {
        tracing::debug!(username = %self.ctx.request.username, "sign-up flow started");

        let result = self.execute().await;
        match &result {
            Ok(response) => {
                self.state = SignUpState::Done;
                tracing::debug!(
                    user_confirmed = response.user_confirmed,
                    "sign-up flow finished"
                );
            }
            Err(error) => {
                self.state = SignUpState::Failed;
                // Terminal action: the captured error IS the completion
                // payload, so the invoker always hears about it.
                tracing::warn!(%error, "sign-up flow failed");
            }
        }
        result
    }

    async fn execute(&mut self) -> Result<SignUpResponse, FlowError> {
        self.state = SignUpState::Submitting;
        let response = self
            .ctx
            .service
            .register(&self.ctx.request, &self.ctx.auth_config.client_id)
            .await?;

        // `user_confirmed == false` is the guard that routes into the
        // confirmation-code challenge; anything else is a direct success.
        if response.user_confirmed {
            return Ok(response);
        }

        self.state = SignUpState::ConfirmationPending;
        tracing::debug!(
            username = %self.ctx.request.username,
            "registration pending confirmation code"
        );

        let SignUpCommand::ConfirmSignUp { code } = self
            .receiver
            .recv()
            .await
            .ok_or(FlowError::ConfirmationAbandoned)?;

        self.state = SignUpState::Confirming;
        self.ctx
            .service
            .confirm_registration(
                &self.ctx.auth_config.client_id,
                &code,
                &self.ctx.request.username,
            )
            .await?;

        Ok(SignUpResponse {
            user_confirmed: true,
            ..response
        })
    }
}
