//! Multi-step flow core.
//!
//! A flow is a bounded sequence of steps ending in exactly one finalizing
//! call (generate a plan, book a session, log an entry). The pieces:
//!
//! - [`form`]: per-flow form state and edge parsing of raw input
//! - [`step`]: steps with pure completion predicates
//! - [`state`]: the Editing / Submitting / Succeeded / Failed machine
//! - [`session`]: navigation, submit tickets, stale-result guarding
//! - [`driver`]: async glue between a session and its gateway
//! - [`presenter`]: what to show for the current status

pub mod driver;
pub mod form;
pub mod presenter;
pub mod session;
pub mod state;
pub mod step;

pub use driver::{Driven, FlowDriver};
pub use form::{FormState, MultiSelect, Prompt};
pub use presenter::{FormView, Presentable, View};
pub use session::{Advance, FlowSession, Resolution, SubmitTicket, TicketId};
pub use state::{FlowFailure, FlowStatus, StatusKind, StatusTransition};
pub use step::{FlowDefinition, Predicate, Step};
