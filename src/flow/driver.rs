//! FlowDriver: runs a session against its injected gateway.

use std::sync::Arc;

use tokio::sync::RwLock;

use super::form::FormState;
use super::presenter::View;
use super::session::{Advance, FlowSession, Resolution};
use super::state::{FlowFailure, StatusKind};
use super::step::FlowDefinition;
use crate::error::{FlowError, GatewayError};
use crate::gateway::RemoteAction;

/// Result of [`FlowDriver::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driven {
    /// Moved forward to this step index.
    Moved(usize),
    /// The gateway ran and its outcome was applied.
    Submitted(StatusKind),
    /// The gateway ran but the session was restarted or disposed meanwhile.
    Discarded,
}

/// Owns one flow session and the gateway that finalizes it.
///
/// The session lock is never held across the network call, so the screen
/// stays responsive while a submit is in flight, and a second `advance()`
/// during that time is refused by the session itself.
pub struct FlowDriver<F: FormState, O> {
    session: Arc<RwLock<FlowSession<F, O>>>,
    action: Arc<dyn RemoteAction<Form = F, Output = O>>,
}

impl<F: FormState, O> Clone for FlowDriver<F, O> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            action: Arc::clone(&self.action),
        }
    }
}

impl<F, O> FlowDriver<F, O>
where
    F: FormState,
    O: Clone + Send + Sync + 'static,
{
    pub fn new(
        definition: Arc<FlowDefinition<F>>,
        action: Arc<dyn RemoteAction<Form = F, Output = O>>,
    ) -> Self {
        Self::from_session(FlowSession::new(definition), action)
    }

    pub fn from_session(
        session: FlowSession<F, O>,
        action: Arc<dyn RemoteAction<Form = F, Output = O>>,
    ) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
            action,
        }
    }

    /// Move forward, or submit on the last step and wait for the outcome.
    ///
    /// The submit runs on its own task and resolves its ticket even if this
    /// future is dropped, so the session never stays stuck in Submitting.
    pub async fn advance(&self) -> Result<Driven, FlowError> {
        let ticket = {
            let mut session = self.session.write().await;
            match session.advance()? {
                Advance::Moved(step) => return Ok(Driven::Moved(step)),
                Advance::Submit(ticket) => ticket,
            }
        };
        let ticket_id = ticket.id;

        let submit = tokio::spawn({
            let session = Arc::clone(&self.session);
            let action = Arc::clone(&self.action);
            async move {
                let outcome = action
                    .submit(&ticket.form)
                    .await
                    .map_err(|e| FlowFailure::from_gateway(&e, action.action()));
                session.write().await.resolve(ticket.id, outcome)
            }
        });

        let resolution = match submit.await {
            Ok(resolution) => resolution,
            Err(e) => {
                tracing::error!(error = %e, ticket = ticket_id.number, "Submit task failed");
                let failure = GatewayError::Transport {
                    reason: e.to_string(),
                };
                let failure = FlowFailure::from_gateway(&failure, self.action.action());
                self.session.write().await.resolve(ticket_id, Err(failure))
            }
        };

        Ok(match resolution {
            Resolution::Applied(kind) => Driven::Submitted(kind),
            Resolution::Stale => Driven::Discarded,
        })
    }

    pub async fn retreat(&self) -> bool {
        self.session.write().await.retreat()
    }

    pub async fn set_field(&self, field: F::Field, raw: &str) -> Result<(), FlowError> {
        self.session.write().await.set_field(field, raw)
    }

    pub async fn set_field_named(&self, name: &str, raw: &str) -> Result<(), FlowError> {
        self.session.write().await.set_field_named(name, raw)
    }

    pub async fn toggle_field(&self, field: F::Field, value: &str) -> Result<(), FlowError> {
        self.session.write().await.toggle_field(field, value)
    }

    pub async fn toggle_field_named(&self, name: &str, value: &str) -> Result<(), FlowError> {
        self.session.write().await.toggle_field_named(name, value)
    }

    /// Apply a typed edit to the form.
    pub async fn update<R>(&self, edit: impl FnOnce(&mut F) -> R) -> Result<R, FlowError> {
        self.session.write().await.update(edit)
    }

    pub async fn dismiss_error(&self) -> bool {
        self.session.write().await.dismiss_error()
    }

    /// Replace the session with a fresh one ("start over").
    pub async fn restart(&self) {
        let mut session = self.session.write().await;
        let fresh = session.restart();
        tracing::info!(
            old_session = %session.id(),
            new_session = %fresh.id(),
            "Flow restarted"
        );
        *session = fresh;
    }

    /// Tear the session down; an outcome still in flight is discarded.
    pub async fn dispose(&self) {
        self.session.write().await.dispose();
    }

    pub async fn view(&self) -> View<O> {
        let session = self.session.read().await;
        View::of(&*session, self.action.submit_label())
    }

    pub async fn form(&self) -> F {
        self.session.read().await.form().clone()
    }

    pub async fn status_kind(&self) -> StatusKind {
        self.session.read().await.status_kind()
    }

    pub async fn current_step(&self) -> usize {
        self.session.read().await.current_step()
    }

    pub async fn can_advance(&self) -> bool {
        self.session.read().await.can_advance()
    }

    /// Read anything else off the session.
    pub async fn with_session<R>(&self, read: impl FnOnce(&FlowSession<F, O>) -> R) -> R {
        read(&*self.session.read().await)
    }

    pub fn action(&self) -> &dyn RemoteAction<Form = F, Output = O> {
        self.action.as_ref()
    }
}
