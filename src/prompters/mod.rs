//! Prompter implementations and the capability trait the engine consumes.

pub mod confirm;
pub mod pick;
pub mod scripted;
pub mod text;
pub mod validate;
pub mod wizard_prompter;

use std::rc::Rc;

use serde_json::Value;

use crate::flow::control::PromptResult;

pub use confirm::ConfirmPrompter;
pub use pick::{PickItem, PickPrompter};
pub use scripted::{ScriptSource, ScriptedPrompter};
pub use text::TextPrompter;
pub use validate::{ValidationError, Validator};
pub use wizard_prompter::WizardPrompter;

/// Estimates how many additional steps a hypothetical response would add.
///
/// Implemented by the engine against a deep copy of the current state;
/// calling it never mutates the real flow.
pub type StepEstimator = Rc<dyn Fn(&PromptResult<Value>) -> usize>;

/// UI-agnostic capability that asks the user for one value.
///
/// Implementations own every interaction concern: rendering, cancellation,
/// timeouts. The engine only interprets the returned [`PromptResult`]; a
/// timeout or dismissal surfaces as [`PromptResult::NoAnswer`] and unwinds
/// exactly one step.
pub trait Prompter {
    /// Shows the prompt and blocks until the user answers or dismisses it.
    fn prompt(&mut self) -> PromptResult<Value>;

    /// Step-position annotation for progress display. Informational only.
    fn set_steps(&mut self, _current: usize, _total: usize) {}

    /// Installs a speculative step estimator for UI affordances.
    fn set_step_estimator(&mut self, _estimator: StepEstimator) {}

    /// Last value the user settled on.
    fn recent_item(&self) -> Option<Value> {
        None
    }

    /// Pre-selects a value, typically the cached answer from a prior visit.
    fn set_recent_item(&mut self, _item: Value) {}

    /// Number of wizard steps this prompter consumed; nested flows report
    /// more than one.
    fn total_steps(&self) -> usize {
        1
    }
}
