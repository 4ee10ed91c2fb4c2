//! Steps and flow definitions.

use std::fmt;

use crate::error::FlowError;

/// Completion check for one step. A plain function pointer, so it cannot
/// capture state and is safe to re-run on every keystroke.
pub type Predicate<F> = fn(&F) -> bool;

/// One page of a flow.
pub struct Step<F> {
    pub index: usize,
    pub label: String,
    pub predicate: Predicate<F>,
}

impl<F> Step<F> {
    /// Whether `form` satisfies this step.
    pub fn is_complete(&self, form: &F) -> bool {
        (self.predicate)(form)
    }
}

impl<F> Clone for Step<F> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            label: self.label.clone(),
            predicate: self.predicate,
        }
    }
}

impl<F> fmt::Debug for Step<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("index", &self.index)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Predicate for steps with nothing to validate.
pub fn always<F>(_: &F) -> bool {
    true
}

/// Ordered, non-empty sequence of steps.
pub struct FlowDefinition<F> {
    name: String,
    steps: Vec<Step<F>>,
}

impl<F> FlowDefinition<F> {
    /// Build a definition from `(label, predicate)` pairs in order.
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        steps: Vec<(S, Predicate<F>)>,
    ) -> Result<Self, FlowError> {
        if steps.is_empty() {
            return Err(FlowError::EmptyDefinition);
        }
        let steps = steps
            .into_iter()
            .enumerate()
            .map(|(index, (label, predicate))| Step {
                index,
                label: label.into(),
                predicate,
            })
            .collect();
        Ok(Self {
            name: name.into(),
            steps,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Step<F>] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.steps.len() - 1
    }

    pub fn step(&self, index: usize) -> Option<&Step<F>> {
        self.steps.get(index)
    }
}

impl<F> fmt::Debug for FlowDefinition<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowDefinition")
            .field("name", &self.name)
            .field("steps", &self.steps)
            .finish()
    }
}
