//! Core data types for AuthFlow.
//!
//! This crate defines the plain data that the rest of the workspace moves
//! around:
//!
//! - **Configuration** ([`ProviderConfig`]) — the identity-provider settings
//!   accepted exactly once at configure time.
//! - **Session data** ([`SessionInfo`], [`CredentialSet`], [`UserPoolTokens`],
//!   [`IdentityId`]) — what an established session consists of.
//!
//! # Architecture
//!
//! The types crate sits at the bottom of the stack. It has no async code and
//! performs no I/O — every other crate depends on it, and it depends on
//! nothing but `serde` (so callers can persist a session through an external
//! storage collaborator) and `thiserror` (for configuration validation).
//!
//! ```text
//! authflow (orchestrator) → authflow-flow → authflow-service → authflow-types
//! ```

mod config;
mod session;

pub use config::{ConfigError, ProviderConfig};
pub use session::{CredentialSet, IdentityId, SessionInfo, UserPoolTokens};
