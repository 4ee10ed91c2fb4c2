//! Flow session: step navigation, form ownership, and submit lifecycle.
//!
//! A session is owned by exactly one screen. It never performs I/O itself:
//! `advance()` on the last step hands back a [`SubmitTicket`] carrying a
//! snapshot of the form, and the caller reports the gateway's outcome
//! through [`FlowSession::resolve`].

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::form::FormState;
use super::state::{FlowFailure, FlowStatus, StatusKind, StatusTransition};
use super::step::{FlowDefinition, Step};
use crate::error::FlowError;

/// Identifies one submit attempt of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TicketId {
    pub session_id: Uuid,
    pub number: u64,
}

/// A submit attempt handed to the gateway.
#[derive(Debug, Clone)]
pub struct SubmitTicket<F> {
    pub id: TicketId,
    /// The form exactly as it was when the submit started.
    pub form: F,
}

/// What `advance()` did.
#[derive(Debug, Clone)]
pub enum Advance<F> {
    /// Moved forward to this step index.
    Moved(usize),
    /// The last step was confirmed; the caller must run the gateway.
    Submit(SubmitTicket<F>),
}

/// Whether a gateway outcome was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Applied(StatusKind),
    /// The ticket no longer matches an in-flight submit of a live session.
    Stale,
}

/// One user's pass through a flow.
#[derive(Debug)]
pub struct FlowSession<F: FormState, O> {
    id: Uuid,
    definition: Arc<FlowDefinition<F>>,
    current_step: usize,
    form: F,
    status: FlowStatus<O>,
    in_flight: Option<u64>,
    submit_count: u64,
    disposed: bool,
    transitions: Vec<StatusTransition>,
}

impl<F: FormState, O> FlowSession<F, O> {
    /// Start a session at step 0 with a default form.
    pub fn new(definition: Arc<FlowDefinition<F>>) -> Self {
        Self::with_form(definition, F::default())
    }

    /// Start a session at step 0 with a pre-filled form.
    pub fn with_form(definition: Arc<FlowDefinition<F>>, form: F) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(session_id = %id, flow = definition.name(), "Flow session started");
        Self {
            id,
            definition,
            current_step: 0,
            form,
            status: FlowStatus::Editing,
            in_flight: None,
            submit_count: 0,
            disposed: false,
            transitions: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn definition(&self) -> &FlowDefinition<F> {
        &self.definition
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn step(&self) -> &Step<F> {
        &self.definition.steps()[self.current_step]
    }

    pub fn is_last_step(&self) -> bool {
        self.current_step == self.definition.last_index()
    }

    pub fn form(&self) -> &F {
        &self.form
    }

    pub fn status(&self) -> &FlowStatus<O> {
        &self.status
    }

    pub fn status_kind(&self) -> StatusKind {
        self.status.kind()
    }

    pub fn transitions(&self) -> &[StatusTransition] {
        &self.transitions
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Whether the forward control should be enabled.
    pub fn can_advance(&self) -> bool {
        !self.disposed
            && self.status.kind().is_editable()
            && self.step().is_complete(&self.form)
    }

    pub fn can_retreat(&self) -> bool {
        !self.disposed && self.current_step > 0
    }

    /// Move forward, or start the submit when on the last step.
    pub fn advance(&mut self) -> Result<Advance<F>, FlowError> {
        if self.disposed {
            return Err(FlowError::Disposed);
        }
        match self.status.kind() {
            StatusKind::Submitting => return Err(FlowError::SubmissionInFlight),
            StatusKind::Succeeded => return Err(FlowError::AlreadySucceeded),
            StatusKind::Editing | StatusKind::Failed => {}
        }

        let step = self.step();
        if !step.is_complete(&self.form) {
            tracing::debug!(
                session_id = %self.id,
                step = self.current_step,
                label = %step.label,
                "Advance blocked by incomplete step"
            );
            return Err(FlowError::ValidationBlocked {
                step: self.current_step,
                label: step.label.clone(),
            });
        }

        if !self.is_last_step() {
            self.current_step += 1;
            tracing::debug!(session_id = %self.id, step = self.current_step, "Advanced");
            return Ok(Advance::Moved(self.current_step));
        }

        self.submit_count += 1;
        let number = self.submit_count;
        self.in_flight = Some(number);
        self.transition(FlowStatus::Submitting, None);
        tracing::info!(
            session_id = %self.id,
            flow = self.definition.name(),
            ticket = number,
            "Submitting flow"
        );
        Ok(Advance::Submit(SubmitTicket {
            id: TicketId {
                session_id: self.id,
                number,
            },
            form: self.form.clone(),
        }))
    }

    /// Move back one step. No validation; a no-op on step 0.
    pub fn retreat(&mut self) -> bool {
        if !self.can_retreat() {
            return false;
        }
        self.current_step -= 1;
        tracing::debug!(session_id = %self.id, step = self.current_step, "Retreated");
        true
    }

    /// Write a scalar field from raw input.
    pub fn set_field(&mut self, field: F::Field, raw: &str) -> Result<(), FlowError> {
        self.ensure_editable()?;
        self.form.set_field(field, raw)?;
        Ok(())
    }

    /// Write a scalar field named by a string.
    pub fn set_field_named(&mut self, name: &str, raw: &str) -> Result<(), FlowError> {
        let field: F::Field = name.parse()?;
        self.set_field(field, raw)
    }

    /// Toggle a value in a multi-select field.
    pub fn toggle_field(&mut self, field: F::Field, value: &str) -> Result<(), FlowError> {
        self.ensure_editable()?;
        self.form.toggle_field(field, value)?;
        Ok(())
    }

    /// Toggle a value in a multi-select field named by a string.
    pub fn toggle_field_named(&mut self, name: &str, value: &str) -> Result<(), FlowError> {
        let field: F::Field = name.parse()?;
        self.toggle_field(field, value)
    }

    /// Apply a typed edit directly to the form.
    pub fn update<R>(&mut self, edit: impl FnOnce(&mut F) -> R) -> Result<R, FlowError> {
        self.ensure_editable()?;
        Ok(edit(&mut self.form))
    }

    /// Apply a gateway outcome for `ticket`.
    pub fn resolve(&mut self, ticket: TicketId, outcome: Result<O, FlowFailure>) -> Resolution {
        if self.disposed || ticket.session_id != self.id || self.in_flight != Some(ticket.number) {
            tracing::warn!(
                session_id = %self.id,
                ticket = ticket.number,
                disposed = self.disposed,
                "Ignoring stale submit result"
            );
            return Resolution::Stale;
        }
        self.in_flight = None;

        match outcome {
            Ok(output) => {
                tracing::info!(session_id = %self.id, ticket = ticket.number, "Flow succeeded");
                self.transition(FlowStatus::Succeeded(output), None);
            }
            Err(failure) => {
                tracing::warn!(
                    session_id = %self.id,
                    ticket = ticket.number,
                    kind = %failure.kind,
                    "Flow submission failed: {}",
                    failure.message
                );
                let reason = Some(failure.message.clone());
                self.transition(FlowStatus::Failed(failure), reason);
            }
        }
        Resolution::Applied(self.status.kind())
    }

    /// Clear the current error and return to plain editing.
    pub fn dismiss_error(&mut self) -> bool {
        if self.status.kind() != StatusKind::Failed {
            return false;
        }
        self.transition(FlowStatus::Editing, Some("error dismissed".to_string()));
        true
    }

    /// A fresh session over the same definition. `self` is left untouched,
    /// so any result still in flight for it stays stale.
    pub fn restart(&self) -> Self {
        let mut fresh = Self::new(Arc::clone(&self.definition));
        if self.status.kind().can_transition_to(StatusKind::Editing) {
            fresh.transitions.push(StatusTransition {
                from: self.status.kind(),
                to: StatusKind::Editing,
                timestamp: Utc::now(),
                reason: Some(format!("restarted from session {}", self.id)),
            });
        }
        fresh
    }

    /// Tear the session down. Results arriving afterwards are ignored.
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.in_flight = None;
        tracing::debug!(session_id = %self.id, "Flow session disposed");
    }

    fn ensure_editable(&self) -> Result<(), FlowError> {
        if self.disposed {
            return Err(FlowError::Disposed);
        }
        let kind = self.status.kind();
        if !kind.is_editable() {
            return Err(FlowError::NotEditable {
                status: kind.to_string(),
            });
        }
        Ok(())
    }

    fn transition(&mut self, next: FlowStatus<O>, reason: Option<String>) {
        let from = self.status.kind();
        let to = next.kind();
        debug_assert!(from.can_transition_to(to), "invalid transition {from} -> {to}");
        self.transitions.push(StatusTransition {
            from,
            to,
            timestamp: Utc::now(),
            reason,
        });
        self.status = next;
    }
}
