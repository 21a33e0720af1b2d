//! Sub-flows for AuthFlow: session fetch, session refresh, and sign-up.
//!
//! Each flow is an isolated Tokio task that performs one bounded unit of
//! work and reports back exactly once. This is the "actor model" — the
//! parent holds no reference into a running flow, and the only way results
//! travel back is the completion channel handed out at spawn time.
//!
//! # Key types
//!
//! - [`spawn_fetch`] / [`spawn_refresh`] — fire-and-forget flows that
//!   resolve an identity id and exchange it for credentials, returning a
//!   [`SessionResult`] through a [`FlowCompletion`]
//! - [`spawn_sign_up`] — an actor that additionally accepts an externally
//!   delivered confirmation code through its [`SignUpHandle`]
//! - [`FetchContext`] / [`RefreshContext`] / [`SignUpContext`] — spawn
//!   data, moved into the flow by value (never shared with the parent)
//! - [`FlowError`] — what a flow can fail with
//!
//! # How it fits in the stack
//!
//! ```text
//! authflow (orchestrator, above)  ← spawns flows, consumes completions
//!     ↕
//! Flow layer (this crate)  ← sequences the network calls
//!     ↕
//! authflow-service (below)  ← the provider client contract
//! ```

#![allow(async_fn_in_trait)]

mod context;
mod error;
mod fetch;
mod refresh;
mod signup;

pub use context::{FetchContext, RefreshContext, SessionResult, SignUpContext};
pub use error::FlowError;
pub use fetch::{spawn_fetch, FetchState, FlowCompletion};
pub use refresh::{spawn_refresh, RefreshState};
pub use signup::{spawn_sign_up, SignUpCompletion, SignUpHandle, SignUpState};
