//! Error types for nutri-flow.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Field error: {0}")]
    Field(#[from] FieldError),

    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Terminal I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Errors raised while writing user input into a form.
///
/// A write that fails leaves the targeted field unset; it never leaves a
/// half-parsed value behind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Field {field} expects a number, got {input:?}")]
    NotNumeric { field: String, input: String },

    #[error("Field {field} expects {expected}, got {input:?}")]
    InvalidFormat {
        field: String,
        input: String,
        expected: String,
    },

    #[error("Field {field} is a multi-select; toggle values instead")]
    NotScalar { field: String },

    #[error("Field {field} is not a multi-select")]
    NotMultiSelect { field: String },

    #[error("Unknown option {value:?} for field {field}")]
    UnknownOption { field: String, value: String },
}

/// Flow controller errors. None of these reach the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("A flow needs at least one step")]
    EmptyDefinition,

    #[error("Step {step} ({label}) is not complete")]
    ValidationBlocked { step: usize, label: String },

    #[error("A submission is already in flight")]
    SubmissionInFlight,

    #[error("The flow already succeeded; restart it to submit again")]
    AlreadySucceeded,

    #[error("The form cannot be edited while {status}")]
    NotEditable { status: String },

    #[error("The flow session has been disposed")]
    Disposed,

    #[error(transparent)]
    Field(#[from] FieldError),
}

/// Coarse failure classes used for user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    AuthRequired,
    ServiceUnavailable,
    Timeout,
    Unknown,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AuthRequired => "auth_required",
            Self::ServiceUnavailable => "service_unavailable",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Errors from the single finalizing call of a flow (or a read call that
/// shares its transport).
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Authentication required (HTTP {status})")]
    AuthRequired { status: u16, detail: Option<String> },

    #[error("Service unavailable (HTTP {status})")]
    ServiceUnavailable { status: u16, detail: Option<String> },

    #[error("Request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Request rejected (HTTP {status})")]
    Rejected { status: u16, detail: Option<String> },

    #[error("Request failed: {reason}")]
    Transport { reason: String },

    #[error("Invalid response: {reason}")]
    InvalidResponse { reason: String },
}

impl GatewayError {
    /// Classify this error for messaging.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::AuthRequired { .. } => FailureKind::AuthRequired,
            Self::ServiceUnavailable { .. } => FailureKind::ServiceUnavailable,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Rejected { .. } | Self::Transport { .. } | Self::InvalidResponse { .. } => {
                FailureKind::Unknown
            }
        }
    }

    /// Server-provided detail text, if the response carried one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::AuthRequired { detail, .. }
            | Self::ServiceUnavailable { detail, .. }
            | Self::Rejected { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Human-readable message for the user. `action` completes the sentence
    /// "Please log in to ..." / "Failed to ...", e.g. "book a consultation".
    pub fn user_message(&self, action: &str) -> String {
        match self.kind() {
            FailureKind::AuthRequired => {
                format!("Authentication required. Please log in to {action}.")
            }
            FailureKind::ServiceUnavailable => {
                "Service temporarily unavailable. Please try again in a few moments.".to_string()
            }
            FailureKind::Timeout => {
                "Request timed out. Your input was likely not saved. Please try again.".to_string()
            }
            FailureKind::Unknown => match self.detail() {
                Some(detail) => format!("Failed to {action}: {detail}"),
                None => format!("Failed to {action}. Please try again."),
            },
        }
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_four_way() {
        let auth = GatewayError::AuthRequired {
            status: 401,
            detail: None,
        };
        let server = GatewayError::ServiceUnavailable {
            status: 503,
            detail: None,
        };
        let timeout = GatewayError::Timeout {
            timeout: Duration::from_secs(1),
        };
        let other = GatewayError::Rejected {
            status: 422,
            detail: None,
        };
        assert_eq!(auth.kind(), FailureKind::AuthRequired);
        assert_eq!(server.kind(), FailureKind::ServiceUnavailable);
        assert_eq!(timeout.kind(), FailureKind::Timeout);
        assert_eq!(other.kind(), FailureKind::Unknown);
        assert_eq!(
            GatewayError::InvalidResponse {
                reason: "empty".into()
            }
            .kind(),
            FailureKind::Unknown
        );
    }

    #[test]
    fn user_messages_differ_per_kind() {
        let action = "generate your diet plan";
        let auth = GatewayError::AuthRequired {
            status: 403,
            detail: None,
        }
        .user_message(action);
        assert_eq!(
            auth,
            "Authentication required. Please log in to generate your diet plan."
        );

        let timeout = GatewayError::Timeout {
            timeout: Duration::from_millis(10),
        }
        .user_message(action);
        assert!(timeout.contains("timed out"));
        assert!(timeout.contains("not saved"));

        let server = GatewayError::ServiceUnavailable {
            status: 500,
            detail: Some("boom".into()),
        }
        .user_message(action);
        assert!(server.contains("temporarily unavailable"));

        let generic = GatewayError::Transport {
            reason: "connection refused".into(),
        }
        .user_message(action);
        assert_eq!(generic, "Failed to generate your diet plan. Please try again.");
    }

    #[test]
    fn unknown_message_carries_server_detail() {
        let err = GatewayError::Rejected {
            status: 400,
            detail: Some("Invalid dietitian ID".into()),
        };
        assert_eq!(
            err.user_message("book a consultation"),
            "Failed to book a consultation: Invalid dietitian ID"
        );
    }

    #[test]
    fn failure_kind_display_matches_serde() {
        for kind in [
            FailureKind::AuthRequired,
            FailureKind::ServiceUnavailable,
            FailureKind::Timeout,
            FailureKind::Unknown,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(format!("\"{kind}\""), json);
        }
    }

    #[test]
    fn field_error_converts_into_flow_error() {
        let field = FieldError::UnknownField("shoe_size".into());
        let flow: FlowError = field.clone().into();
        assert_eq!(flow, FlowError::Field(field));
        let top: Error = flow.into();
        assert!(top.to_string().contains("shoe_size"));
    }
}
