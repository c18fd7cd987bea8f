//! Control signals and prompt outcomes shared across the wizard engine.

use std::fmt;

use serde_json::Value;

/// Non-data signals that alter wizard flow instead of supplying an answer.
///
/// Every variant is distinguishable from any legitimate answer because the
/// two live in different arms of [`PromptResult`].
#[derive(Debug, Clone, PartialEq)]
pub enum FlowControl {
    /// Re-display the current prompt without consuming progress.
    Retry,
    /// Return to the previously executed step, discarding the current one.
    Back,
    /// Abort the entire flow.
    Exit,
    /// Advance to the next chained link, carrying the raw response forward.
    Chain(Value),
}

impl fmt::Display for FlowControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowControl::Retry => write!(f, "Retry"),
            FlowControl::Back => write!(f, "Back"),
            FlowControl::Exit => write!(f, "Exit"),
            FlowControl::Chain(_) => write!(f, "Chain"),
        }
    }
}

/// Outcome of showing a prompter to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptResult<T> {
    /// The user supplied a concrete answer.
    Value(T),
    /// A flow-control request instead of data.
    Control(FlowControl),
    /// The prompt was dismissed without an answer; treated as a single-step
    /// undo, exactly like [`FlowControl::Back`].
    NoAnswer,
}

impl<T> PromptResult<T> {
    /// True when the response carries a concrete answer.
    pub fn is_valid(&self) -> bool {
        matches!(self, PromptResult::Value(_))
    }

    /// Extracts the answer, if any.
    pub fn into_value(self) -> Option<T> {
        match self {
            PromptResult::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Borrows the answer, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            PromptResult::Value(value) => Some(value),
            _ => None,
        }
    }
}
