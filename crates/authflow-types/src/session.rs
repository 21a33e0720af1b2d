//! Session data: identity ids, tokens, credentials, and the session record.
//!
//! A "session" is the client's record of who it is talking to the provider
//! as. It tracks:
//! - WHO the session belongs to (an [`IdentityId`], when an identity pool
//!   is configured)
//! - WHAT it can do (a [`CredentialSet`] of temporary access credentials)
//! - HOW it was established (`authenticated` — signed in, or a guest)

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// IdentityId
// ---------------------------------------------------------------------------

/// An opaque identity identifier issued by the identity pool.
///
/// This is a newtype wrapper around `String`: the provider's handle is
/// opaque to us, but wrapping it keeps it from being confused with the
/// many other strings in this domain (tokens, usernames, pool ids).
///
/// `#[serde(transparent)]` makes it serialize as the bare string, so a
/// persisted session looks like `"identity_id": "us-west-2:abc"` rather
/// than a nested object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(pub String);

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for IdentityId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// UserPoolTokens
// ---------------------------------------------------------------------------

/// Tokens issued by the user pool after a successful sign-in.
///
/// These prove authenticated identity during identity and credential
/// resolution. They are transient: the orchestrator passes them into a
/// flow's spawn data and does not retain them afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPoolTokens {
    /// The ID token, required for authenticated identity resolution.
    pub id_token: String,

    /// The access token, when the provider issued one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// The refresh token, when the provider issued one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl UserPoolTokens {
    /// Builds a token set carrying only an ID token.
    pub fn id_only(id_token: impl Into<String>) -> Self {
        Self {
            id_token: id_token.into(),
            access_token: None,
            refresh_token: None,
        }
    }
}

// ---------------------------------------------------------------------------
// CredentialSet
// ---------------------------------------------------------------------------

/// Short-lived access credentials scoped to an identity id.
///
/// Issued by the credential exchange and replaced wholesale on every
/// refresh. `expiration` drives the refresh fast path: an unforced refresh
/// of unexpired credentials is a no-op that never touches the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSet {
    pub access_key_id: String,
    pub secret_access_key: String,

    /// Session token accompanying temporary credentials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,

    /// When these credentials stop being valid. `None` means the provider
    /// did not report an expiry; such credentials are treated as expired
    /// so that refresh always re-issues them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<SystemTime>,
}

impl CredentialSet {
    /// Returns `true` if the credentials are expired at `now`.
    ///
    /// Credentials without a reported expiration count as expired — the
    /// conservative reading, since we cannot prove they are still valid.
    pub fn is_expired(&self, now: SystemTime) -> bool {
        match self.expiration {
            Some(expiration) => now >= expiration,
            None => true,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionInfo
// ---------------------------------------------------------------------------

/// The currently valid session.
///
/// Exactly one instance is authoritative at a time, owned by the
/// orchestrator. It is replaced wholesale on every successful fetch or
/// refresh — never patched field by field — and cleared to absent on
/// sign-out. Sub-flows return candidate session data through their
/// completion payload; only the orchestrator writes it.
///
/// Both `identity_id` and `credentials` are `None` when no identity pool
/// is configured: the session then records only whether the user is
/// authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// The resolved identity id, when an identity pool is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_id: Option<IdentityId>,

    /// The temporary credentials, when an identity pool is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<CredentialSet>,

    /// Whether this session was established via a sign-in (`true`) or as
    /// an unauthenticated guest (`false`).
    pub authenticated: bool,
}
