//! Yes/no prompter backed by `dialoguer::Confirm`.

use dialoguer::Confirm;
use serde_json::Value;

use crate::flow::control::PromptResult;
use crate::prompters::Prompter;

/// Asks a yes/no question and resolves to a boolean value.
///
/// Used as the exit-confirmation prompter: answering yes aborts the flow.
pub struct ConfirmPrompter {
    message: String,
    default: bool,
}

impl ConfirmPrompter {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            default: false,
        }
    }

    pub fn with_default(mut self, default: bool) -> Self {
        self.default = default;
        self
    }
}

impl Prompter for ConfirmPrompter {
    fn prompt(&mut self) -> PromptResult<Value> {
        match Confirm::new()
            .with_prompt(&self.message)
            .default(self.default)
            .interact_opt()
        {
            Ok(Some(answer)) => PromptResult::Value(Value::Bool(answer)),
            Ok(None) => PromptResult::NoAnswer,
            Err(_) => PromptResult::NoAnswer,
        }
    }
}
