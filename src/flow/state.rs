//! Flow status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FailureKind, GatewayError};

/// Discriminant of [`FlowStatus`], used for transition checks and logging.
///
/// ```text
/// Editing ──advance(last)──▶ Submitting ──ok──▶ Succeeded
///    ▲                          │    ▲             │
///    │                          err  └─resubmit─┐  │
///    └──────dismiss──────── Failed ◀────────────┘  │
///    └──────────────────restart────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Editing,
    Submitting,
    Succeeded,
    Failed,
}

impl StatusKind {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: StatusKind) -> bool {
        use StatusKind::*;
        matches!(
            (self, target),
            (Editing, Submitting)
                | (Failed, Submitting)
                | (Submitting, Succeeded)
                | (Submitting, Failed)
                | (Failed, Editing)
                | (Succeeded, Editing)
        )
    }

    /// Whether the form accepts edits in this status.
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Editing | Self::Failed)
    }
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Editing => "editing",
            Self::Submitting => "submitting",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A failed submission, normalized for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl FlowFailure {
    pub fn from_gateway(err: &GatewayError, action: &str) -> Self {
        Self {
            kind: err.kind(),
            message: err.user_message(action),
        }
    }
}

/// Status of a flow session. The payload lives inside the variant, so a
/// session can never be "submitting" and "showing a result" at once.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowStatus<O> {
    Editing,
    Submitting,
    Succeeded(O),
    Failed(FlowFailure),
}

impl<O> FlowStatus<O> {
    pub fn kind(&self) -> StatusKind {
        match self {
            Self::Editing => StatusKind::Editing,
            Self::Submitting => StatusKind::Submitting,
            Self::Succeeded(_) => StatusKind::Succeeded,
            Self::Failed(_) => StatusKind::Failed,
        }
    }

    pub fn output(&self) -> Option<&O> {
        match self {
            Self::Succeeded(output) => Some(output),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&FlowFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

impl<O> Default for FlowStatus<O> {
    fn default() -> Self {
        Self::Editing
    }
}

/// A recorded status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTransition {
    pub from: StatusKind,
    pub to: StatusKind,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}
