//! Result presenter: maps a session to exactly one thing to show.

use serde::Serialize;

use super::form::FormState;
use super::session::FlowSession;
use super::state::{FlowFailure, FlowStatus};

/// Label of the forward control on non-final steps.
pub const NEXT_LABEL: &str = "Next";

/// A normalized payload that can describe itself to the user.
pub trait Presentable {
    /// Markdown summary of the payload.
    fn render(&self) -> String;
}

/// The form page currently shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormView {
    pub step: usize,
    pub step_count: usize,
    pub label: String,
    pub can_advance: bool,
    pub can_retreat: bool,
    /// "Next", or the flow's submit label on the last step.
    pub trigger_label: String,
}

/// What the screen should show for the current status.
#[derive(Debug, Clone, PartialEq)]
pub enum View<O> {
    Editing(FormView),
    /// Submission running; the trigger is disabled.
    InProgress { step_label: String },
    Success(O),
    Failure { failure: FlowFailure, form: FormView },
}

impl<O: Clone> View<O> {
    pub fn of<F: FormState>(session: &FlowSession<F, O>, submit_label: &str) -> Self {
        match session.status() {
            FlowStatus::Editing => View::Editing(form_view(session, submit_label)),
            FlowStatus::Submitting => View::InProgress {
                step_label: session.step().label.clone(),
            },
            FlowStatus::Succeeded(output) => View::Success(output.clone()),
            FlowStatus::Failed(failure) => View::Failure {
                failure: failure.clone(),
                form: form_view(session, submit_label),
            },
        }
    }
}

impl<O> View<O> {
    /// Whether the forward control may be pressed.
    pub fn trigger_enabled(&self) -> bool {
        match self {
            View::Editing(form) | View::Failure { form, .. } => form.can_advance,
            View::InProgress { .. } | View::Success(_) => false,
        }
    }
}

impl<O: Presentable> View<O> {
    /// Plain-text rendering for terminal front ends.
    pub fn render(&self) -> String {
        match self {
            View::Editing(form) => render_form(form),
            View::InProgress { step_label } => {
                format!("⏳ Working on it... ({step_label} submitted, please wait)")
            }
            View::Success(output) => output.render(),
            View::Failure { failure, form } => {
                format!("⚠ {}\n{}", failure.message, render_form(form))
            }
        }
    }
}

fn form_view<F: FormState, O>(session: &FlowSession<F, O>, submit_label: &str) -> FormView {
    let trigger_label = if session.is_last_step() {
        submit_label.to_string()
    } else {
        NEXT_LABEL.to_string()
    };
    FormView {
        step: session.current_step(),
        step_count: session.definition().len(),
        label: session.step().label.clone(),
        can_advance: session.can_advance(),
        can_retreat: session.can_retreat(),
        trigger_label,
    }
}

fn render_form(form: &FormView) -> String {
    let mut parts = vec![format!(
        "Step {} of {}: {}",
        form.step + 1,
        form.step_count,
        form.label
    )];
    let mut controls = Vec::new();
    if form.can_retreat {
        controls.push("[Back]".to_string());
    }
    if form.can_advance {
        controls.push(format!("[{}]", form.trigger_label));
    } else {
        controls.push(format!("({} disabled)", form.trigger_label));
    }
    parts.push(controls.join(" "));
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use super::*;
    use crate::error::{FailureKind, FieldError};
    use crate::flow::form::Prompt;
    use crate::flow::session::Advance;
    use crate::flow::step::{FlowDefinition, Predicate, always};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Note {
        text: String,
    }

    #[derive(Debug, Clone, Copy)]
    struct Text;

    impl std::fmt::Display for Text {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "text")
        }
    }

    impl FromStr for Text {
        type Err = FieldError;
        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s {
                "text" => Ok(Text),
                other => Err(FieldError::UnknownField(other.into())),
            }
        }
    }

    impl FormState for Note {
        type Field = Text;
        fn set_field(&mut self, _field: Text, raw: &str) -> Result<(), FieldError> {
            self.text = raw.to_string();
            Ok(())
        }
        fn toggle_field(&mut self, field: Text, _value: &str) -> Result<(), FieldError> {
            Err(FieldError::NotMultiSelect {
                field: field.to_string(),
            })
        }
        fn prompts(_step: usize) -> Vec<Prompt<Text>> {
            vec![Prompt::scalar(Text, "Text?")]
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Saved(String);

    impl Presentable for Saved {
        fn render(&self) -> String {
            format!("# Saved\n{}", self.0)
        }
    }

    fn has_text(n: &Note) -> bool {
        !n.text.is_empty()
    }

    fn session() -> FlowSession<Note, Saved> {
        let steps: Vec<(&str, Predicate<Note>)> = vec![("Write", has_text), ("Review", always)];
        FlowSession::new(Arc::new(FlowDefinition::new("note", steps).unwrap()))
    }

    #[test]
    fn editing_view_disables_trigger_until_complete() {
        let mut s = session();
        let view = View::of(&s, "Save");
        assert!(!view.trigger_enabled());
        match &view {
            View::Editing(form) => {
                assert_eq!(form.trigger_label, NEXT_LABEL);
                assert!(!form.can_retreat);
                assert_eq!(form.step_count, 2);
            }
            other => panic!("unexpected view {other:?}"),
        }
        assert!(view.render().contains("Step 1 of 2: Write"));
        assert!(view.render().contains("(Next disabled)"));

        s.set_field(Text, "hello").unwrap();
        assert!(View::of(&s, "Save").trigger_enabled());
    }

    #[test]
    fn last_step_uses_submit_label() {
        let mut s = session();
        s.set_field(Text, "hello").unwrap();
        s.advance().unwrap();
        match View::of(&s, "Save") {
            View::Editing(form) => {
                assert_eq!(form.trigger_label, "Save");
                assert!(form.can_retreat);
            }
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[test]
    fn each_status_maps_to_one_view() {
        let mut s = session();
        s.set_field(Text, "hello").unwrap();
        s.advance().unwrap();
        let ticket = match s.advance().unwrap() {
            Advance::Submit(t) => t,
            Advance::Moved(_) => panic!("expected submit"),
        };

        let busy = View::of(&s, "Save");
        assert!(matches!(busy, View::InProgress { .. }));
        assert!(!busy.trigger_enabled());

        s.resolve(
            ticket.id,
            Err(FlowFailure {
                kind: FailureKind::ServiceUnavailable,
                message: "Service temporarily unavailable.".into(),
            }),
        );
        let failed = View::of(&s, "Save");
        assert!(failed.trigger_enabled());
        assert!(failed.render().starts_with("⚠ Service temporarily unavailable."));

        let retry = match s.advance().unwrap() {
            Advance::Submit(t) => t,
            Advance::Moved(_) => panic!("expected submit"),
        };
        s.resolve(retry.id, Ok(Saved("hello".into())));
        let done = View::of(&s, "Save");
        assert_eq!(done, View::Success(Saved("hello".into())));
        assert_eq!(done.render(), "# Saved\nhello");
    }
}
