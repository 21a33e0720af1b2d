//! # Authflow
//!
//! Client-side session and authorization orchestration for a hosted
//! identity provider.
//!
//! Authflow models the session lifecycle as a hierarchy of cooperating
//! actors: a root orchestrator owning the authorization state machine,
//! and short-lived flow tasks that fetch, refresh, and register. Callers
//! implement a single [`CredentialService`] trait over their provider's
//! API and drive the machine through an [`AuthorizationHandle`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use authflow::prelude::*;
//!
//! // Implement CredentialService for your provider client, then:
//! // let auth = spawn_authorization(|config: &ProviderConfig| {
//! //     MyClient::new(config)
//! // });
//! // auth.configure(config).await?;
//! // auth.fetch_unauth_session().await?;
//! ```

mod error;
mod event;
mod orchestrator;

pub use error::AuthFlowError;
pub use event::{AuthorizationState, FlowKind, LifecycleEvent, StatusSnapshot};
pub use orchestrator::{
    spawn_authorization, spawn_authorization_with_observer, AuthorizationHandle,
};

// Re-export the layered crates so downstream users depend on one crate.
pub use authflow_flow as flow;
pub use authflow_service as service;
pub use authflow_types as types;

pub mod prelude {
    pub use crate::error::AuthFlowError;
    pub use crate::event::{
        AuthorizationState, FlowKind, LifecycleEvent, StatusSnapshot,
    };
    pub use crate::orchestrator::{
        spawn_authorization, spawn_authorization_with_observer, AuthorizationHandle,
    };
    pub use authflow_flow::{
        spawn_sign_up, FlowError, SignUpContext, SignUpHandle, SessionResult,
    };
    pub use authflow_service::{
        CodeDeliveryDetails, CredentialService, ServiceError, ServiceFactory,
        SignUpRequest, SignUpResponse,
    };
    pub use authflow_types::{
        ConfigError, CredentialSet, IdentityId, ProviderConfig, SessionInfo,
        UserPoolTokens,
    };
}
