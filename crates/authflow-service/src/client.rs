//! The [`CredentialService`] and [`ServiceFactory`] traits.
//!
//! These are the seams between AuthFlow's state machines and the real
//! world. The flows only ever call this contract; swapping the concrete
//! provider client for a mock changes no framework code.

use authflow_types::{CredentialSet, IdentityId, ProviderConfig};

use crate::{ServiceError, SignUpRequest, SignUpResponse};

/// The network operations the identity provider exposes.
///
/// # Trait bounds
///
/// - `Send + Sync` — the service handle is shared (behind an `Arc`)
///   between the orchestrator and whichever flow task is currently
///   running, and Tokio may poll those tasks from different threads.
/// - `'static` — the handle outlives any single flow.
///
/// Each method returns `impl Future` rather than using `async fn` in the
/// trait directly so the returned futures are `Send` and the flows can be
/// spawned onto the runtime.
pub trait CredentialService: Send + Sync + 'static {
    /// Resolves an identity id for a guest (no sign-in).
    fn resolve_unauthenticated_identity(
        &self,
    ) -> impl std::future::Future<Output = Result<IdentityId, ServiceError>> + Send;

    /// Resolves an identity id for a signed-in user, proven by `id_token`.
    fn resolve_authenticated_identity(
        &self,
        id_token: &str,
    ) -> impl std::future::Future<Output = Result<IdentityId, ServiceError>> + Send;

    /// Exchanges a guest identity id for temporary credentials.
    fn exchange_unauthenticated_credentials(
        &self,
        identity_id: &IdentityId,
    ) -> impl std::future::Future<Output = Result<CredentialSet, ServiceError>> + Send;

    /// Exchanges an authenticated identity id (plus the proving ID token)
    /// for temporary credentials.
    fn exchange_authenticated_credentials(
        &self,
        identity_id: &IdentityId,
        id_token: &str,
    ) -> impl std::future::Future<Output = Result<CredentialSet, ServiceError>> + Send;

    /// Registers a new user with the user pool identified by `client_id`.
    fn register(
        &self,
        request: &SignUpRequest,
        client_id: &str,
    ) -> impl std::future::Future<Output = Result<SignUpResponse, ServiceError>> + Send;

    /// Confirms a pending registration with the code the user received.
    fn confirm_registration(
        &self,
        client_id: &str,
        code: &str,
        username: &str,
    ) -> impl std::future::Future<Output = Result<(), ServiceError>> + Send;
}

/// Shared handles delegate to the service they wrap, so an `Arc`-held
/// service (e.g. one a test keeps a handle to) can serve as a factory's
/// product directly.
impl<T: CredentialService> CredentialService for std::sync::Arc<T> {
    fn resolve_unauthenticated_identity(
        &self,
    ) -> impl std::future::Future<Output = Result<IdentityId, ServiceError>> + Send {
        self.as_ref().resolve_unauthenticated_identity()
    }

    fn resolve_authenticated_identity(
        &self,
        id_token: &str,
    ) -> impl std::future::Future<Output = Result<IdentityId, ServiceError>> + Send {
        self.as_ref().resolve_authenticated_identity(id_token)
    }

    fn exchange_unauthenticated_credentials(
        &self,
        identity_id: &IdentityId,
    ) -> impl std::future::Future<Output = Result<CredentialSet, ServiceError>> + Send
    {
        self.as_ref().exchange_unauthenticated_credentials(identity_id)
    }

    fn exchange_authenticated_credentials(
        &self,
        identity_id: &IdentityId,
        id_token: &str,
    ) -> impl std::future::Future<Output = Result<CredentialSet, ServiceError>> + Send
    {
        self.as_ref()
            .exchange_authenticated_credentials(identity_id, id_token)
    }

    fn register(
        &self,
        request: &SignUpRequest,
        client_id: &str,
    ) -> impl std::future::Future<Output = Result<SignUpResponse, ServiceError>> + Send
    {
        self.as_ref().register(request, client_id)
    }

    fn confirm_registration(
        &self,
        client_id: &str,
        code: &str,
        username: &str,
    ) -> impl std::future::Future<Output = Result<(), ServiceError>> + Send {
        self.as_ref().confirm_registration(client_id, code, username)
    }
}

/// Builds a [`CredentialService`] from a [`ProviderConfig`].
///
/// The orchestrator owns a factory and calls it exactly once, when it
/// processes the `configure` event. Keeping construction behind a trait
/// (instead of a `new(config)` on the service) means the orchestrator
/// never names a concrete client type — production wires in the real SDK
/// client, tests wire in a mock.
pub trait ServiceFactory: Send + 'static {
    /// The service this factory produces.
    type Service: CredentialService;

    /// Constructs a service handle for the given configuration.
    fn create(&self, config: &ProviderConfig) -> Self::Service;
}

/// Closures can serve as factories directly:
/// `spawn_authorization(|config: &ProviderConfig| MyClient::new(config))`.
impl<F, S> ServiceFactory for F
where
    F: Fn(&ProviderConfig) -> S + Send + 'static,
    S: CredentialService,
{
    type Service = S;

    fn create(&self, config: &ProviderConfig) -> S {
        self(config)
    }
}
