//! Step and trace records emitted to the visualizer.
//!
//! A [`Step`] is one snapshot of program state at a single instrumented
//! execution point; the [`Trace`] is the ordered, append-only sequence of
//! Steps for one run. The serialized field names (`event`, `func_name`,
//! `line_no`, `local_vars`, `global_vars`, `output`) are the wire contract
//! with the front end and must not change.

use indexmap::IndexMap;
use serde::Serialize;

/// Function name recorded for steps taken at module scope.
pub const MODULE_SCOPE: &str = "<module>";

/// Which instrumentation event produced a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A source line is about to execute.
    Line,
    /// A user-defined function frame returned normally.
    Return,
}

/// One recorded snapshot: variables as name→text maps (insertion order
/// preserved) plus the output chunk printed since the previous step.
#[derive(Debug, Clone, Serialize)]
pub struct Step {
    pub event: EventKind,
    pub func_name: String,
    pub line_no: u32,
    pub local_vars: IndexMap<String, String>,
    pub global_vars: IndexMap<String, String>,
    pub output: String,
}

/// Ordered sequence of steps for one run. Append-only while the program
/// executes; the finalizer may patch the last step exactly once.
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub struct Trace {
    steps: Vec<Step>,
}

impl Trace {
    pub fn new() -> Self {
        Trace::default()
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn last_mut(&mut self) -> Option<&mut Step> {
        self.steps.last_mut()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
