//! Registration request and response types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Everything the registration call needs.
///
/// Gathered by the caller and carried, by value, in the sign-up flow's
/// spawn context. The maps mirror the provider API: `attributes` become
/// user attributes (email, phone), `validation_data` is passed to any
/// pre-sign-up hook, and `client_metadata` is forwarded verbatim to
/// provider triggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub validation_data: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub client_metadata: HashMap<String, String>,
}

impl SignUpRequest {
    /// Builds a request with just a username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            attributes: HashMap::new(),
            validation_data: HashMap::new(),
            client_metadata: HashMap::new(),
        }
    }
}

/// The provider's answer to a registration call.
///
/// `user_confirmed == false` is not an error — it is the control-flow
/// signal that routes the sign-up flow into its confirmation-code step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpResponse {
    /// Whether the user is already confirmed. `false` means a
    /// confirmation-code challenge is pending.
    pub user_confirmed: bool,

    /// The provider-assigned unique id for the new user, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_sub: Option<String>,

    /// Where the confirmation code was sent, when one was sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_delivery: Option<CodeDeliveryDetails>,
}

/// How and where a confirmation code was delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDeliveryDetails {
    /// Delivery medium, e.g. `"EMAIL"` or `"SMS"`.
    pub medium: String,
    /// Masked destination, e.g. `"j***@e***.com"`.
    pub destination: String,
}
