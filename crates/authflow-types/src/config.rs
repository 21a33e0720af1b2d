//! Identity-provider configuration.

use serde::{Deserialize, Serialize};

/// Settings for the identity provider integration.
///
/// The orchestrator accepts a `ProviderConfig` exactly once, at configure
/// time, and constructs its service handle from it. After that the config is
/// immutable — reconfiguring a live machine is a protocol violation and is
/// rejected, never applied silently.
///
/// `identity_pool_id` is deliberately optional. A deployment that only uses
/// the user pool (sign-up / sign-in, no temporary credentials) leaves it
/// unset, which disables identity and credential resolution entirely: fetch
/// and refresh flows then complete with an absent identity id and absent
/// credentials without ever touching the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider region, e.g. `"us-west-2"`.
    pub region: String,

    /// The user pool that holds registered users.
    pub user_pool_id: String,

    /// The identity pool that issues identity ids and temporary
    /// credentials. `None` disables identity/credential resolution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_pool_id: Option<String>,

    /// The app client id registered with the user pool.
    pub client_id: String,
}

impl ProviderConfig {
    /// Checks that the required fields are present and non-empty.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingField`] naming the first empty
    /// required field. `identity_pool_id` is not required, but when it is
    /// present it must not be an empty string.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.region.is_empty() {
            return Err(ConfigError::MissingField("region"));
        }
        if self.user_pool_id.is_empty() {
            return Err(ConfigError::MissingField("user_pool_id"));
        }
        if self.client_id.is_empty() {
            return Err(ConfigError::MissingField("client_id"));
        }
        if matches!(self.identity_pool_id.as_deref(), Some("")) {
            return Err(ConfigError::MissingField("identity_pool_id"));
        }
        Ok(())
    }

    /// Returns `true` when an identity pool is configured, i.e. when
    /// identity/credential resolution is enabled.
    pub fn has_identity_pool(&self) -> bool {
        self.identity_pool_id.is_some()
    }
}

/// Errors found while validating a [`ProviderConfig`].
///
/// `Clone` is derived deliberately: configuration errors travel through
/// completion channels and are retained in the orchestrator's terminal
/// error state, where observers read them back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required field is missing or empty.
    #[error("provider configuration field `{0}` is missing or empty")]
    MissingField(&'static str),
}
