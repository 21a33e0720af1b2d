//! The authorization orchestrator: a root actor owning the session
//! lifecycle.
//!
//! The orchestrator runs in its own Tokio task, processing one event at a
//! time from its command channel. Callers talk to it through an
//! [`AuthorizationHandle`]; sub-flows report back through an internal
//! completion channel. That gives the machine the properties the design
//! depends on:
//!
//! - exactly one transition is processed at a time (one task, one queue),
//! - the authoritative [`SessionInfo`] has a single writer (this task),
//! - at most one fetch-or-refresh flow is in flight (every event that
//!   would spawn another is rejected while one is active),
//! - a canceled sign-in simply stops listening: completions are tagged
//!   with a generation counter, and a stale flow's result is discarded
//!   when it eventually arrives.

use std::sync::Arc;

use authflow_flow::{
    spawn_fetch, spawn_refresh, FetchContext, FlowCompletion, RefreshContext,
    SessionResult,
};
use authflow_service::ServiceFactory;
use authflow_types::{ProviderConfig, SessionInfo, UserPoolTokens};
use tokio::sync::{mpsc, oneshot};

use crate::{
    AuthFlowError, AuthorizationState, FlowKind, LifecycleEvent, StatusSnapshot,
};

/// Command channel size for the orchestrator actor.
const COMMAND_CHANNEL_SIZE: usize = 32;

type Reply = oneshot::Sender<Result<(), AuthFlowError>>;

/// Events the orchestrator accepts, carried over its command channel.
///
/// Each variant pairs the event payload with a reply channel: the caller
/// learns whether the event was accepted or rejected as a protocol
/// violation ([`AuthFlowError::InvalidTransition`]).
enum Command {
    Configure {
        config: ProviderConfig,
        reply: Reply,
    },
    CachedCredentialsAvailable {
        session: SessionInfo,
        reply: Reply,
    },
    SignInRequested {
        reply: Reply,
    },
    SignInCompleted {
        tokens: UserPoolTokens,
        reply: Reply,
    },
    CancelSignIn {
        reply: Reply,
    },
    FetchUnauthSession {
        reply: Reply,
    },
    RefreshSession {
        tokens: Option<UserPoolTokens>,
        force_refresh: bool,
        reply: Reply,
    },
    SignOutRequested {
        reply: Reply,
    },
    ThrowError {
        error: AuthFlowError,
        reply: Reply,
    },
    Status {
        reply: oneshot::Sender<StatusSnapshot>,
    },
}

/// A sub-flow's completion report, relayed onto the orchestrator's
/// internal event queue.
struct FlowCompleted {
    /// The generation the flow was spawned under. A mismatch with the
    /// current generation means the orchestrator moved on (e.g. the
    /// sign-in was canceled) and this result is discarded.
    generation: u64,
    kind: FlowKind,
    /// The `authenticated` flag to stamp on the resulting session.
    authenticated: bool,
    result: Result<SessionResult, authflow_flow::FlowError>,
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle to a running authorization machine.
///
/// Cheap to clone — it wraps an `mpsc::Sender`. All methods send an event
/// and await the machine's accept/reject decision; the actual work (flow
/// spawning, network calls) continues asynchronously, observable through
/// [`status`](AuthorizationHandle::status) and the lifecycle observer.
#[derive(Clone)]
pub struct AuthorizationHandle {
    sender: mpsc::Sender<Command>,
}

impl AuthorizationHandle {
    /// Accepts the provider configuration and constructs the service
    /// handle. Valid only before any other event.
    pub async fn configure(&self, config: ProviderConfig) -> Result<(), AuthFlowError> {
        self.request(|reply| Command::Configure { config, reply }).await
    }

    /// Short-circuits straight to an established session using a
    /// previously persisted [`SessionInfo`] supplied by the external
    /// storage collaborator. Bypasses fetch entirely.
    pub async fn cached_credentials_available(
        &self,
        session: SessionInfo,
    ) -> Result<(), AuthFlowError> {
        self.request(|reply| Command::CachedCredentialsAvailable { session, reply })
            .await
    }

    /// Enters the sign-in path; the machine then waits for
    /// [`sign_in_completed`](Self::sign_in_completed) or
    /// [`cancel_sign_in`](Self::cancel_sign_in).
    pub async fn sign_in_requested(&self) -> Result<(), AuthFlowError> {
        self.request(|reply| Command::SignInRequested { reply }).await
    }

    /// Reports a successful sign-in; spawns the authenticated session
    /// fetch with the supplied tokens.
    pub async fn sign_in_completed(
        &self,
        tokens: UserPoolTokens,
    ) -> Result<(), AuthFlowError> {
        self.request(|reply| Command::SignInCompleted { tokens, reply })
            .await
    }

    /// Aborts a pending sign-in and falls back to establishing an
    /// unauthenticated session.
    pub async fn cancel_sign_in(&self) -> Result<(), AuthFlowError> {
        self.request(|reply| Command::CancelSignIn { reply }).await
    }

    /// Establishes an unauthenticated (guest) session.
    pub async fn fetch_unauth_session(&self) -> Result<(), AuthFlowError> {
        self.request(|reply| Command::FetchUnauthSession { reply }).await
    }

    /// Renews the established session's credentials. An unforced refresh
    /// of unexpired credentials is a network-free no-op.
    pub async fn refresh_session(
        &self,
        tokens: Option<UserPoolTokens>,
        force_refresh: bool,
    ) -> Result<(), AuthFlowError> {
        self.request(|reply| Command::RefreshSession {
            tokens,
            force_refresh,
            reply,
        })
        .await
    }

    /// Clears the session and returns to `configured`.
    pub async fn sign_out_requested(&self) -> Result<(), AuthFlowError> {
        self.request(|reply| Command::SignOutRequested { reply }).await
    }

    /// Drives the machine into its terminal error state with a
    /// caller-supplied error.
    pub async fn throw_error(&self, error: AuthFlowError) -> Result<(), AuthFlowError> {
        self.request(|reply| Command::ThrowError { error, reply }).await
    }

    /// Returns a point-in-time snapshot of state, session, and error.
    pub async fn status(&self) -> Result<StatusSnapshot, AuthFlowError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(Command::Status { reply: tx })
            .await
            .map_err(|_| AuthFlowError::Unavailable)?;
        rx.await.map_err(|_| AuthFlowError::Unavailable)
    }

    /// Shorthand for `status().state`.
    pub async fn state(&self) -> Result<AuthorizationState, AuthFlowError> {
        Ok(self.status().await?.state)
    }

    /// Shorthand for `status().session`.
    pub async fn session(&self) -> Result<Option<SessionInfo>, AuthFlowError> {
        Ok(self.status().await?.session)
    }

    async fn request(
        &self,
        make: impl FnOnce(Reply) -> Command,
    ) -> Result<(), AuthFlowError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(make(tx))
            .await
            .map_err(|_| AuthFlowError::Unavailable)?;
        rx.await.map_err(|_| AuthFlowError::Unavailable)?
    }
}

// ---------------------------------------------------------------------------
// Spawning
// ---------------------------------------------------------------------------

/// Spawns an authorization machine and returns its handle.
///
/// `factory` builds the credential service when the `configure` event is
/// processed; a closure `|config: &ProviderConfig| MyClient::new(config)`
/// works directly.
pub fn spawn_authorization<F: ServiceFactory>(factory: F) -> AuthorizationHandle {
    spawn_inner(factory, None)
}

/// Like [`spawn_authorization`], with a lifecycle observer attached.
///
/// The observer receives [`LifecycleEvent`]s for every state change, flow
/// spawn/completion, and session replacement. Dropping the receiver stops
/// the notifications without affecting the machine.
pub fn spawn_authorization_with_observer<F: ServiceFactory>(
    factory: F,
    observer: mpsc::UnboundedSender<LifecycleEvent>,
) -> AuthorizationHandle {
    spawn_inner(factory, Some(observer))
}

fn spawn_inner<F: ServiceFactory>(
    factory: F,
    observer: Option<mpsc::UnboundedSender<LifecycleEvent>>,
) -> AuthorizationHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
    let (done_tx, done_rx) = mpsc::unbounded_channel();

    let actor = Orchestrator {
        factory,
        config: None,
        service: None,
        state: AuthorizationState::NotConfigured,
        session: None,
        error: None,
        generation: 0,
        commands: cmd_rx,
        completions: done_rx,
        completions_tx: done_tx,
        observer,
    };

    tokio::spawn(actor.run());

    AuthorizationHandle { sender: cmd_tx }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// The orchestrator's internal state. Lives inside the spawned task;
/// nothing outside the task can touch it.
struct Orchestrator<F: ServiceFactory> {
    factory: F,

    /// Accepted exactly once, at `configure`.
    config: Option<ProviderConfig>,
    /// Built from the config by the factory, shared with flows via `Arc`.
    service: Option<Arc<F::Service>>,

    state: AuthorizationState,
    /// The single authoritative session. Replaced wholesale, never
    /// patched field by field.
    session: Option<SessionInfo>,
    /// The causing error, retained once the terminal state is reached.
    error: Option<AuthFlowError>,

    /// Bumped on every flow spawn; completions carrying an older
    /// generation are discarded.
    generation: u64,

    commands: mpsc::Receiver<Command>,
    completions: mpsc::UnboundedReceiver<FlowCompleted>,
    completions_tx: mpsc::UnboundedSender<FlowCompleted>,

    observer: Option<mpsc::UnboundedSender<LifecycleEvent>>,
}

impl<F: ServiceFactory> Orchestrator<F> {
    /// Runs the actor loop until every handle is dropped.
    async fn run(mut self) {
        tracing::info!("authorization machine started");

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                Some(done) = self.completions.recv() => {
                    self.handle_completion(done);
                }
            }
        }

        tracing::info!("authorization machine stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Configure { config, reply } => {
                let _ = reply.send(self.configure(config));
            }
            Command::CachedCredentialsAvailable { session, reply } => {
                let _ = reply.send(self.cached_credentials_available(session));
            }
            Command::SignInRequested { reply } => {
                let _ = reply.send(self.sign_in_requested());
            }
            Command::SignInCompleted { tokens, reply } => {
                let _ = reply.send(self.sign_in_completed(tokens));
            }
            Command::CancelSignIn { reply } => {
                let _ = reply.send(self.cancel_sign_in());
            }
            Command::FetchUnauthSession { reply } => {
                let _ = reply.send(self.fetch_unauth_session());
            }
            Command::RefreshSession {
                tokens,
                force_refresh,
                reply,
            } => {
                let _ = reply.send(self.refresh_session(tokens, force_refresh));
            }
            Command::SignOutRequested { reply } => {
                let _ = reply.send(self.sign_out_requested());
            }
            Command::ThrowError { error, reply } => {
                let _ = reply.send(self.throw_error(error));
            }
            Command::Status { reply } => {
                let _ = reply.send(StatusSnapshot {
                    state: self.state,
                    session: self.session.clone(),
                    error: self.error.clone(),
                });
            }
        }
    }

    // -- Event handlers ----------------------------------------------------

    fn configure(&mut self, config: ProviderConfig) -> Result<(), AuthFlowError> {
        if self.state != AuthorizationState::NotConfigured {
            return Err(self.invalid("configure"));
        }
        config.validate()?;

        self.service = Some(Arc::new(self.factory.create(&config)));
        self.config = Some(config);
        self.transition(AuthorizationState::Configured);
        Ok(())
    }

    fn cached_credentials_available(
        &mut self,
        session: SessionInfo,
    ) -> Result<(), AuthFlowError> {
        if self.state != AuthorizationState::NotConfigured {
            return Err(self.invalid("cachedCredentialAvailable"));
        }

        self.observe(LifecycleEvent::SessionReplaced {
            authenticated: session.authenticated,
        });
        self.session = Some(session);
        self.transition(AuthorizationState::SessionEstablished);
        Ok(())
    }

    fn sign_in_requested(&mut self) -> Result<(), AuthFlowError> {
        match self.state {
            AuthorizationState::Configured
            | AuthorizationState::SessionEstablished => {
                self.transition(AuthorizationState::SigningIn);
                Ok(())
            }
            _ => Err(self.invalid("signInRequested")),
        }
    }

    fn sign_in_completed(
        &mut self,
        tokens: UserPoolTokens,
    ) -> Result<(), AuthFlowError> {
        if self.state != AuthorizationState::SigningIn {
            return Err(self.invalid("signInCompleted"));
        }

        self.spawn_fetch_flow(true, Some(tokens))?;
        self.transition(AuthorizationState::FetchingAuthenticatedSession);
        Ok(())
    }

    fn cancel_sign_in(&mut self) -> Result<(), AuthFlowError> {
        if self.state != AuthorizationState::SigningIn {
            return Err(self.invalid("cancelSignIn"));
        }

        tracing::info!("sign-in canceled, falling back to unauthenticated session");
        self.spawn_fetch_flow(false, None)?;
        self.transition(AuthorizationState::FetchingUnauthenticatedSession);
        Ok(())
    }

    fn fetch_unauth_session(&mut self) -> Result<(), AuthFlowError> {
        if self.state != AuthorizationState::Configured {
            return Err(self.invalid("fetchUnAuthSession"));
        }

        self.spawn_fetch_flow(false, None)?;
        self.transition(AuthorizationState::FetchingUnauthenticatedSession);
        Ok(())
    }

    fn refresh_session(
        &mut self,
        tokens: Option<UserPoolTokens>,
        force_refresh: bool,
    ) -> Result<(), AuthFlowError> {
        if self.state != AuthorizationState::SessionEstablished {
            return Err(self.invalid("refreshSession"));
        }

        self.spawn_refresh_flow(tokens, force_refresh)?;
        self.transition(AuthorizationState::RefreshingSession);
        Ok(())
    }

    fn sign_out_requested(&mut self) -> Result<(), AuthFlowError> {
        if self.state != AuthorizationState::SessionEstablished {
            return Err(self.invalid("signOutRequested"));
        }

        // Cleared wholesale: a later unauthenticated fetch must not
        // inherit this session's identity id.
        self.session = None;
        self.observe(LifecycleEvent::SessionCleared);
        self.transition(AuthorizationState::Configured);
        Ok(())
    }

    fn throw_error(&mut self, error: AuthFlowError) -> Result<(), AuthFlowError> {
        if self.state.is_terminal() {
            return Err(self.invalid("throwError"));
        }
        self.fail(error);
        Ok(())
    }

    // -- Flow supervision --------------------------------------------------

    /// Spawns a session fetch flow. An unauthenticated fetch reuses the
    /// current session's identity id when one exists; an authenticated
    /// fetch always resolves a fresh one from the tokens.
    fn spawn_fetch_flow(
        &mut self,
        authenticated: bool,
        tokens: Option<UserPoolTokens>,
    ) -> Result<(), AuthFlowError> {
        let (config, service) = self.client()?;

        let identity_id = if authenticated {
            None
        } else {
            self.session
                .as_ref()
                .and_then(|session| session.identity_id.clone())
        };

        self.generation += 1;
        let completion = spawn_fetch(FetchContext {
            client_config: config,
            service,
            identity_id,
            authenticated,
            user_pool_tokens: tokens,
        });
        self.forward_completion(FlowKind::Fetch, authenticated, completion);
        self.observe(LifecycleEvent::FlowSpawned {
            kind: FlowKind::Fetch,
        });
        Ok(())
    }

    /// Spawns a session refresh flow seeded from the established session.
    ///
    /// The completion keeps the session's current `authenticated` flag:
    /// refreshing an authenticated session leaves it authenticated.
    fn spawn_refresh_flow(
        &mut self,
        tokens: Option<UserPoolTokens>,
        force_refresh: bool,
    ) -> Result<(), AuthFlowError> {
        let (config, service) = self.client()?;
        let session = self
            .session
            .as_ref()
            .expect("sessionEstablished always holds a session");

        self.generation += 1;
        let completion = spawn_refresh(RefreshContext {
            client_config: config,
            service,
            identity_id: session.identity_id.clone(),
            credentials: session.credentials.clone(),
            user_pool_tokens: tokens,
            force_refresh,
        });
        self.forward_completion(FlowKind::Refresh, session.authenticated, completion);
        self.observe(LifecycleEvent::FlowSpawned {
            kind: FlowKind::Refresh,
        });
        Ok(())
    }

    /// Relays a flow's one-shot completion onto the internal event queue,
    /// tagged with the generation it was spawned under.
    fn forward_completion(
        &self,
        kind: FlowKind,
        authenticated: bool,
        completion: FlowCompletion,
    ) {
        let generation = self.generation;
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            // A dropped sender means the flow task itself went away;
            // there is nothing to report.
            if let Ok(result) = completion.await {
                let _ = tx.send(FlowCompleted {
                    generation,
                    kind,
                    authenticated,
                    result,
                });
            }
        });
    }

    fn handle_completion(&mut self, done: FlowCompleted) {
        // A completion is only live if it belongs to the current spawn
        // generation AND the machine is still waiting on a flow. A thrown
        // error can drive the machine terminal while a flow is in flight;
        // its late result must not resurrect the session.
        if done.generation != self.generation || !self.state.is_flow_active() {
            tracing::debug!(
                kind = %done.kind,
                state = %self.state,
                "stale flow completion discarded"
            );
            return;
        }

        self.observe(LifecycleEvent::FlowCompleted {
            kind: done.kind,
            success: done.result.is_ok(),
        });

        match done.result {
            Ok(result) => {
                let session = result.into_session(done.authenticated);
                tracing::info!(
                    kind = %done.kind,
                    authenticated = session.authenticated,
                    "session established"
                );
                self.observe(LifecycleEvent::SessionReplaced {
                    authenticated: session.authenticated,
                });
                self.session = Some(session);
                self.transition(AuthorizationState::SessionEstablished);
            }
            Err(error) => self.fail(error.into()),
        }
    }

    // -- Shared plumbing ---------------------------------------------------

    /// The configured client config and service handle, required before
    /// any flow can spawn.
    fn client(&self) -> Result<(ProviderConfig, Arc<F::Service>), AuthFlowError> {
        let config = self.config.clone().ok_or(AuthFlowError::NotConfigured)?;
        let service = self.service.clone().ok_or(AuthFlowError::NotConfigured)?;
        Ok((config, service))
    }

    fn invalid(&self, event: &'static str) -> AuthFlowError {
        AuthFlowError::InvalidTransition {
            state: self.state,
            event,
        }
    }

    fn transition(&mut self, to: AuthorizationState) {
        let from = self.state;
        self.state = to;
        tracing::info!(%from, %to, "authorization state changed");
        self.observe(LifecycleEvent::StateChanged { from, to });
    }

    fn fail(&mut self, error: AuthFlowError) {
        tracing::error!(%error, "authorization failed");
        self.error = Some(error);
        self.transition(AuthorizationState::Error);
    }

    fn observe(&self, event: LifecycleEvent) {
        if let Some(observer) = &self.observer {
            let _ = observer.send(event);
        }
    }
}
