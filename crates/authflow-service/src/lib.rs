//! The credential service contract for AuthFlow.
//!
//! AuthFlow does not implement the identity provider's network client —
//! that's the provider SDK's job (HTTP, TLS, request signing, wire format).
//! Instead, this crate defines the [`CredentialService`] trait: the exact
//! set of operations the flows call, and nothing more.
//!
//! 1. **Identity resolution** — turn "nothing" or an ID token into an
//!    identity id ([`CredentialService::resolve_unauthenticated_identity`],
//!    [`CredentialService::resolve_authenticated_identity`])
//! 2. **Credential exchange** — turn an identity id into temporary
//!    credentials ([`CredentialService::exchange_unauthenticated_credentials`],
//!    [`CredentialService::exchange_authenticated_credentials`])
//! 3. **Registration** — sign-up and confirmation-code calls
//!    ([`CredentialService::register`],
//!    [`CredentialService::confirm_registration`])
//!
//! A concrete implementation wraps the real provider client; tests supply
//! mocks that record calls and script outcomes. [`ServiceFactory`] is the
//! companion seam the orchestrator uses to build a service handle from a
//! [`ProviderConfig`](authflow_types::ProviderConfig) exactly once, at
//! configure time.

#![allow(async_fn_in_trait)]

mod client;
mod error;
mod signup;

pub use client::{CredentialService, ServiceFactory};
pub use error::ServiceError;
pub use signup::{CodeDeliveryDetails, SignUpRequest, SignUpResponse};
