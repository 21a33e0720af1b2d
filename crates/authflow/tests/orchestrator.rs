//! Integration tests for the authorization orchestrator.
//!
//! A scripted `MockService` stands in for the provider client, shared
//! with the test through an `Arc` so assertions can inspect the calls the
//! machine's flows actually made. State progress is observed through the
//! lifecycle observer channel rather than by polling status.

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use authflow::prelude::*;
use tokio::sync::mpsc;
use tokio::sync::Notify;

// =========================================================================
// Mock service
// =========================================================================

/// A scripted provider client. `fail_*` slots make operations fail;
/// `gate_identity`, when set, parks identity resolution until notified.
#[derive(Default)]
struct MockService {
    calls: Mutex<Vec<&'static str>>,
    fail_credentials: Option<ServiceError>,
    gate_identity: Option<Arc<Notify>>,
}

impl MockService {
    fn happy() -> Self {
        Self::default()
    }

    fn recorded_calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

fn credentials(access_key_id: &str) -> CredentialSet {
    CredentialSet {
        access_key_id: access_key_id.into(),
        secret_access_key: "secret".into(),
        session_token: Some("session".into()),
        expiration: Some(SystemTime::now() + Duration::from_secs(3600)),
    }
}

// The factory hands out an `Arc<MockService>`, which serves through the
// library's delegating `Arc` impl, so the same instance can be the
// factory's product and stay inspectable from the test.
impl CredentialService for MockService {
    async fn resolve_unauthenticated_identity(
        &self,
    ) -> Result<IdentityId, ServiceError> {
        if let Some(gate) = &self.gate_identity {
            gate.notified().await;
        }
        self.record("resolve_unauthenticated_identity");
        Ok(IdentityId::from("anon-123"))
    }

    async fn resolve_authenticated_identity(
        &self,
        _id_token: &str,
    ) -> Result<IdentityId, ServiceError> {
        if let Some(gate) = &self.gate_identity {
            gate.notified().await;
        }
        self.record("resolve_authenticated_identity");
        Ok(IdentityId::from("auth-456"))
    }

    async fn exchange_unauthenticated_credentials(
        &self,
        _identity_id: &IdentityId,
    ) -> Result<CredentialSet, ServiceError> {
        self.record("exchange_unauthenticated_credentials");
        match &self.fail_credentials {
            Some(err) => Err(err.clone()),
            None => Ok(credentials("AK1")),
        }
    }

    async fn exchange_authenticated_credentials(
        &self,
        _identity_id: &IdentityId,
        _id_token: &str,
    ) -> Result<CredentialSet, ServiceError> {
        self.record("exchange_authenticated_credentials");
        match &self.fail_credentials {
            Some(err) => Err(err.clone()),
            None => Ok(credentials("AK2")),
        }
    }

    async fn register(
        &self,
        _request: &SignUpRequest,
        _client_id: &str,
    ) -> Result<SignUpResponse, ServiceError> {
        self.record("register");
        Ok(SignUpResponse {
            user_confirmed: true,
            user_sub: Some("sub-1".into()),
            code_delivery: None,
        })
    }

    async fn confirm_registration(
        &self,
        _client_id: &str,
        _code: &str,
        _username: &str,
    ) -> Result<(), ServiceError> {
        self.record("confirm_registration");
        Ok(())
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn config_with_pool() -> ProviderConfig {
    ProviderConfig {
        region: "us-west-2".into(),
        user_pool_id: "us-west-2_pool".into(),
        identity_pool_id: Some("us-west-2:idp".into()),
        client_id: "client-1".into(),
    }
}

fn config_without_pool() -> ProviderConfig {
    ProviderConfig {
        identity_pool_id: None,
        ..config_with_pool()
    }
}

type Observer = mpsc::UnboundedReceiver<LifecycleEvent>;

/// Spawns a machine around the given mock, with an observer attached.
fn spawn_with_mock(service: Arc<MockService>) -> (AuthorizationHandle, Observer) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = spawn_authorization_with_observer(
        move |_config: &ProviderConfig| Arc::clone(&service),
        tx,
    );
    (handle, rx)
}

/// Consumes observer events until the machine reaches `target`.
async fn wait_for_state(observer: &mut Observer, target: AuthorizationState) {
    tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            let event = observer.recv().await.expect("observer channel closed");
            if matches!(event, LifecycleEvent::StateChanged { to, .. } if to == target)
            {
                return;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for state {target}"));
}

/// Collects the next `n` observer events, in order.
async fn next_events(observer: &mut Observer, n: usize) -> Vec<LifecycleEvent> {
    let mut events = Vec::with_capacity(n);
    for _ in 0..n {
        let event = tokio::time::timeout(Duration::from_secs(1), observer.recv())
            .await
            .expect("timed out waiting for lifecycle event")
            .expect("observer channel closed");
        events.push(event);
    }
    events
}

/// Configure + fetch an unauthenticated session, waiting until settled.
async fn establish_guest_session(
    handle: &AuthorizationHandle,
    observer: &mut Observer,
) {
    handle.configure(config_with_pool()).await.unwrap();
    handle.fetch_unauth_session().await.unwrap();
    wait_for_state(observer, AuthorizationState::SessionEstablished).await;
}

// =========================================================================
// Configuration
// =========================================================================

#[tokio::test]
async fn test_configure_transitions_to_configured() {
    let (handle, _observer) = spawn_with_mock(Arc::new(MockService::happy()));

    handle.configure(config_with_pool()).await.unwrap();

    assert_eq!(handle.state().await.unwrap(), AuthorizationState::Configured);
}

#[tokio::test]
async fn test_configure_twice_is_rejected() {
    let (handle, _observer) = spawn_with_mock(Arc::new(MockService::happy()));
    handle.configure(config_with_pool()).await.unwrap();

    let result = handle.configure(config_with_pool()).await;

    assert_eq!(
        result,
        Err(AuthFlowError::InvalidTransition {
            state: AuthorizationState::Configured,
            event: "configure",
        })
    );
}

#[tokio::test]
async fn test_configure_with_invalid_config_stays_not_configured() {
    let (handle, _observer) = spawn_with_mock(Arc::new(MockService::happy()));
    let config = ProviderConfig {
        region: "".into(),
        ..config_with_pool()
    };

    let result = handle.configure(config).await;

    assert!(matches!(result, Err(AuthFlowError::Configuration(_))));
    assert_eq!(
        handle.state().await.unwrap(),
        AuthorizationState::NotConfigured
    );
}

#[tokio::test]
async fn test_fetch_before_configure_is_rejected() {
    let (handle, _observer) = spawn_with_mock(Arc::new(MockService::happy()));

    let result = handle.fetch_unauth_session().await;

    assert_eq!(
        result,
        Err(AuthFlowError::InvalidTransition {
            state: AuthorizationState::NotConfigured,
            event: "fetchUnAuthSession",
        })
    );
}

// =========================================================================
// Guest session (unauthenticated fetch)
// =========================================================================

#[tokio::test]
async fn test_guest_session_resolves_identity_then_credentials() {
    let service = Arc::new(MockService::happy());
    let (handle, mut observer) = spawn_with_mock(Arc::clone(&service));

    establish_guest_session(&handle, &mut observer).await;

    let session = handle.session().await.unwrap().expect("session settled");
    assert!(!session.authenticated);
    assert_eq!(session.identity_id, Some(IdentityId::from("anon-123")));
    assert_eq!(session.credentials.unwrap().access_key_id, "AK1");
    assert_eq!(
        service.recorded_calls(),
        vec![
            "resolve_unauthenticated_identity",
            "exchange_unauthenticated_credentials",
        ]
    );
}

#[tokio::test]
async fn test_guest_session_without_identity_pool_settles_empty() {
    let service = Arc::new(MockService::happy());
    let (handle, mut observer) = spawn_with_mock(Arc::clone(&service));

    handle.configure(config_without_pool()).await.unwrap();
    handle.fetch_unauth_session().await.unwrap();
    wait_for_state(&mut observer, AuthorizationState::SessionEstablished).await;

    let session = handle.session().await.unwrap().unwrap();
    assert_eq!(session.identity_id, None);
    assert_eq!(session.credentials, None);
    assert!(service.recorded_calls().is_empty());
}

#[tokio::test]
async fn test_guest_flow_emits_ordered_lifecycle_events() {
    let service = Arc::new(MockService::happy());
    let (handle, mut observer) = spawn_with_mock(service);

    handle.configure(config_with_pool()).await.unwrap();
    handle.fetch_unauth_session().await.unwrap();

    let events = next_events(&mut observer, 6).await;
    assert_eq!(
        events,
        vec![
            LifecycleEvent::StateChanged {
                from: AuthorizationState::NotConfigured,
                to: AuthorizationState::Configured,
            },
            LifecycleEvent::FlowSpawned {
                kind: FlowKind::Fetch,
            },
            LifecycleEvent::StateChanged {
                from: AuthorizationState::Configured,
                to: AuthorizationState::FetchingUnauthenticatedSession,
            },
            LifecycleEvent::FlowCompleted {
                kind: FlowKind::Fetch,
                success: true,
            },
            LifecycleEvent::SessionReplaced {
                authenticated: false,
            },
            LifecycleEvent::StateChanged {
                from: AuthorizationState::FetchingUnauthenticatedSession,
                to: AuthorizationState::SessionEstablished,
            },
        ]
    );
}

// =========================================================================
// Sign-in
// =========================================================================

#[tokio::test]
async fn test_sign_in_establishes_authenticated_session() {
    let service = Arc::new(MockService::happy());
    let (handle, mut observer) = spawn_with_mock(Arc::clone(&service));
    handle.configure(config_with_pool()).await.unwrap();

    handle.sign_in_requested().await.unwrap();
    assert_eq!(handle.state().await.unwrap(), AuthorizationState::SigningIn);

    handle
        .sign_in_completed(UserPoolTokens::id_only("id-token"))
        .await
        .unwrap();
    wait_for_state(&mut observer, AuthorizationState::SessionEstablished).await;

    let session = handle.session().await.unwrap().unwrap();
    assert!(session.authenticated);
    assert_eq!(session.identity_id, Some(IdentityId::from("auth-456")));
    assert_eq!(session.credentials.unwrap().access_key_id, "AK2");
    assert_eq!(
        service.recorded_calls(),
        vec![
            "resolve_authenticated_identity",
            "exchange_authenticated_credentials",
        ]
    );
}

#[tokio::test]
async fn test_cancel_sign_in_falls_back_to_guest_session() {
    let service = Arc::new(MockService::happy());
    let (handle, mut observer) = spawn_with_mock(Arc::clone(&service));
    handle.configure(config_with_pool()).await.unwrap();

    handle.sign_in_requested().await.unwrap();
    handle.cancel_sign_in().await.unwrap();
    wait_for_state(&mut observer, AuthorizationState::SessionEstablished).await;

    let session = handle.session().await.unwrap().unwrap();
    assert!(!session.authenticated);
    assert_eq!(session.identity_id, Some(IdentityId::from("anon-123")));
    assert_eq!(
        service.recorded_calls(),
        vec![
            "resolve_unauthenticated_identity",
            "exchange_unauthenticated_credentials",
        ]
    );
}

#[tokio::test]
async fn test_cancel_sign_in_reuses_established_identity() {
    // A guest session already holds an identity id; canceling a later
    // sign-in attempt must reuse it instead of resolving a new one.
    let service = Arc::new(MockService::happy());
    let (handle, mut observer) = spawn_with_mock(Arc::clone(&service));
    establish_guest_session(&handle, &mut observer).await;

    handle.sign_in_requested().await.unwrap();
    handle.cancel_sign_in().await.unwrap();
    wait_for_state(&mut observer, AuthorizationState::SessionEstablished).await;

    assert_eq!(
        service.recorded_calls(),
        vec![
            "resolve_unauthenticated_identity",
            "exchange_unauthenticated_credentials",
            "exchange_unauthenticated_credentials",
        ]
    );
}

#[tokio::test]
async fn test_sign_in_completed_without_sign_in_is_rejected() {
    let (handle, _observer) = spawn_with_mock(Arc::new(MockService::happy()));
    handle.configure(config_with_pool()).await.unwrap();

    let result = handle
        .sign_in_completed(UserPoolTokens::id_only("id-token"))
        .await;

    assert_eq!(
        result,
        Err(AuthFlowError::InvalidTransition {
            state: AuthorizationState::Configured,
            event: "signInCompleted",
        })
    );
}

// =========================================================================
// Refresh
// =========================================================================

#[tokio::test]
async fn test_refresh_unforced_with_valid_credentials_skips_network() {
    let service = Arc::new(MockService::happy());
    let (handle, mut observer) = spawn_with_mock(Arc::clone(&service));
    establish_guest_session(&handle, &mut observer).await;
    let before = handle.session().await.unwrap().unwrap();
    let calls_before = service.recorded_calls().len();

    handle.refresh_session(None, false).await.unwrap();
    wait_for_state(&mut observer, AuthorizationState::SessionEstablished).await;

    let after = handle.session().await.unwrap().unwrap();
    assert_eq!(after, before);
    assert_eq!(service.recorded_calls().len(), calls_before);
}

#[tokio::test]
async fn test_refresh_forced_exchanges_and_preserves_unauthenticated_flag() {
    let service = Arc::new(MockService::happy());
    let (handle, mut observer) = spawn_with_mock(Arc::clone(&service));
    establish_guest_session(&handle, &mut observer).await;

    handle.refresh_session(None, true).await.unwrap();
    wait_for_state(&mut observer, AuthorizationState::SessionEstablished).await;

    let session = handle.session().await.unwrap().unwrap();
    assert!(!session.authenticated);
    assert_eq!(session.identity_id, Some(IdentityId::from("anon-123")));
    assert_eq!(
        service.recorded_calls().last(),
        Some(&"exchange_unauthenticated_credentials")
    );
}

#[tokio::test]
async fn test_refresh_preserves_authenticated_flag() {
    let service = Arc::new(MockService::happy());
    let (handle, mut observer) = spawn_with_mock(Arc::clone(&service));
    handle.configure(config_with_pool()).await.unwrap();
    handle.sign_in_requested().await.unwrap();
    handle
        .sign_in_completed(UserPoolTokens::id_only("id-token"))
        .await
        .unwrap();
    wait_for_state(&mut observer, AuthorizationState::SessionEstablished).await;

    handle
        .refresh_session(Some(UserPoolTokens::id_only("id-token")), true)
        .await
        .unwrap();
    wait_for_state(&mut observer, AuthorizationState::SessionEstablished).await;

    let session = handle.session().await.unwrap().unwrap();
    assert!(session.authenticated);
    assert_eq!(
        service.recorded_calls().last(),
        Some(&"exchange_authenticated_credentials")
    );
}

#[tokio::test]
async fn test_refresh_without_established_session_is_rejected() {
    let (handle, _observer) = spawn_with_mock(Arc::new(MockService::happy()));
    handle.configure(config_with_pool()).await.unwrap();

    let result = handle.refresh_session(None, true).await;

    assert_eq!(
        result,
        Err(AuthFlowError::InvalidTransition {
            state: AuthorizationState::Configured,
            event: "refreshSession",
        })
    );
}

// =========================================================================
// Sign-out
// =========================================================================

#[tokio::test]
async fn test_sign_out_clears_session_and_returns_to_configured() {
    let service = Arc::new(MockService::happy());
    let (handle, mut observer) = spawn_with_mock(Arc::clone(&service));
    establish_guest_session(&handle, &mut observer).await;

    handle.sign_out_requested().await.unwrap();

    let status = handle.status().await.unwrap();
    assert_eq!(status.state, AuthorizationState::Configured);
    assert_eq!(status.session, None);
}

#[tokio::test]
async fn test_fetch_after_sign_out_resolves_a_fresh_identity() {
    // Sign-out must not leave a stale identity id behind: the next guest
    // fetch resolves from scratch.
    let service = Arc::new(MockService::happy());
    let (handle, mut observer) = spawn_with_mock(Arc::clone(&service));
    establish_guest_session(&handle, &mut observer).await;

    handle.sign_out_requested().await.unwrap();
    handle.fetch_unauth_session().await.unwrap();
    wait_for_state(&mut observer, AuthorizationState::SessionEstablished).await;

    assert_eq!(
        service.recorded_calls(),
        vec![
            "resolve_unauthenticated_identity",
            "exchange_unauthenticated_credentials",
            "resolve_unauthenticated_identity",
            "exchange_unauthenticated_credentials",
        ]
    );
}

// =========================================================================
// Cached credentials
// =========================================================================

#[tokio::test]
async fn test_cached_credentials_short_circuit_to_established() {
    let service = Arc::new(MockService::happy());
    let (handle, _observer) = spawn_with_mock(Arc::clone(&service));
    let cached = SessionInfo {
        identity_id: Some(IdentityId::from("cached-id")),
        credentials: Some(credentials("CACHED")),
        authenticated: true,
    };

    handle
        .cached_credentials_available(cached.clone())
        .await
        .unwrap();

    let status = handle.status().await.unwrap();
    assert_eq!(status.state, AuthorizationState::SessionEstablished);
    assert_eq!(status.session, Some(cached));
    assert!(service.recorded_calls().is_empty());
}

#[tokio::test]
async fn test_refresh_on_cached_only_machine_requires_configuration() {
    // The cached short-circuit skips `configure`, so no service exists
    // yet; anything needing the network must say so.
    let (handle, _observer) = spawn_with_mock(Arc::new(MockService::happy()));
    handle
        .cached_credentials_available(SessionInfo {
            identity_id: None,
            credentials: Some(credentials("CACHED")),
            authenticated: false,
        })
        .await
        .unwrap();

    let result = handle.refresh_session(None, true).await;

    assert_eq!(result, Err(AuthFlowError::NotConfigured));
}

// =========================================================================
// Error handling
// =========================================================================

#[tokio::test]
async fn test_flow_failure_enters_terminal_error_state() {
    let service = Arc::new(MockService {
        fail_credentials: Some(ServiceError::network(
            "exchange_unauthenticated_credentials",
            "connection reset",
        )),
        ..MockService::happy()
    });
    let (handle, mut observer) = spawn_with_mock(service);
    handle.configure(config_with_pool()).await.unwrap();

    handle.fetch_unauth_session().await.unwrap();
    wait_for_state(&mut observer, AuthorizationState::Error).await;

    let status = handle.status().await.unwrap();
    assert!(matches!(status.error, Some(AuthFlowError::Flow(_))));

    // Terminal means terminal: nothing but status queries is accepted.
    let result = handle.fetch_unauth_session().await;
    assert_eq!(
        result,
        Err(AuthFlowError::InvalidTransition {
            state: AuthorizationState::Error,
            event: "fetchUnAuthSession",
        })
    );
}

#[tokio::test]
async fn test_throw_error_drives_machine_terminal() {
    let (handle, _observer) = spawn_with_mock(Arc::new(MockService::happy()));
    handle.configure(config_with_pool()).await.unwrap();

    handle
        .throw_error(AuthFlowError::Flow(FlowError::MissingTokens))
        .await
        .unwrap();

    let status = handle.status().await.unwrap();
    assert_eq!(status.state, AuthorizationState::Error);
    assert_eq!(
        status.error,
        Some(AuthFlowError::Flow(FlowError::MissingTokens))
    );

    let again = handle.throw_error(AuthFlowError::NotConfigured).await;
    assert_eq!(
        again,
        Err(AuthFlowError::InvalidTransition {
            state: AuthorizationState::Error,
            event: "throwError",
        })
    );
}

#[tokio::test]
async fn test_completion_after_thrown_error_is_discarded() {
    // The fetch parks on the gate; the error is thrown while it is still
    // in flight. Releasing the gate lets the flow finish, but its late
    // success must not pull the machine out of the terminal state.
    let gate = Arc::new(Notify::new());
    let service = Arc::new(MockService {
        gate_identity: Some(Arc::clone(&gate)),
        ..MockService::happy()
    });
    let (handle, _observer) = spawn_with_mock(service);
    handle.configure(config_with_pool()).await.unwrap();
    handle.fetch_unauth_session().await.unwrap();

    handle
        .throw_error(AuthFlowError::Flow(FlowError::MissingIdentity))
        .await
        .unwrap();
    gate.notify_one();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let status = handle.status().await.unwrap();
    assert_eq!(status.state, AuthorizationState::Error);
    assert_eq!(status.session, None);
}

// =========================================================================
// Handle lifecycle
// =========================================================================

#[tokio::test]
async fn test_machine_stops_when_every_handle_drops() {
    let (handle, _observer) = spawn_with_mock(Arc::new(MockService::happy()));
    let clone = handle.clone();
    drop(handle);

    // The surviving clone still works.
    clone.configure(config_with_pool()).await.unwrap();
    drop(clone);
    // Nothing left to assert through; the actor loop exits on its own.
}
