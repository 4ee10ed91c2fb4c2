//! Remote action gateway: the one network call that finalizes a flow.
//!
//! Each flow type implements [`RemoteAction`] over a shared [`ApiClient`].
//! Gateways are constructed explicitly and injected into a
//! [`FlowDriver`](crate::flow::FlowDriver), so tests substitute fakes.

pub mod client;

use async_trait::async_trait;

pub use client::ApiClient;

use crate::error::GatewayError;
use crate::flow::FormState;

/// Finalizes a completed flow.
#[async_trait]
pub trait RemoteAction: Send + Sync {
    type Form: FormState;
    type Output: Send + Sync + 'static;

    /// Completes "Please log in to ..." / "Failed to ..." in user messages.
    fn action(&self) -> &str;

    /// Label of the forward control on the last step.
    fn submit_label(&self) -> &str {
        "Submit"
    }

    /// Send the snapshot `form` and normalize the response. Called at most
    /// once per submit; no retries.
    async fn submit(&self, form: &Self::Form) -> Result<Self::Output, GatewayError>;
}
