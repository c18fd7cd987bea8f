//! Free-text prompter backed by `dialoguer::Input`.

use colored::Colorize;
use dialoguer::Input;
use serde_json::Value;

use crate::flow::control::{FlowControl, PromptResult};
use crate::prompters::validate::Validator;
use crate::prompters::Prompter;

/// Asks for a line of text, re-prompting until the validator accepts it.
///
/// The commands `:back`, `:retry`, and `:exit` (or `:quit`) translate into
/// the matching control signals, mirroring the menu prompters' Back entry.
pub struct TextPrompter {
    label: String,
    validator: Validator,
    recent: Option<Value>,
    steps: Option<(usize, usize)>,
}

impl TextPrompter {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            validator: Validator::None,
            recent: None,
            steps: None,
        }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    fn print_header(&self) {
        if let Some((current, total)) = self.steps {
            let title = format!("Step {} / {} — {}", current, total, self.label);
            println!("{}", title.bold());
        }
    }
}

impl Prompter for TextPrompter {
    fn prompt(&mut self) -> PromptResult<Value> {
        self.print_header();
        loop {
            let mut input = Input::<String>::new()
                .with_prompt(&self.label)
                .allow_empty(true);
            if let Some(Value::String(initial)) = &self.recent {
                input = input.with_initial_text(initial.clone());
            }

            let raw = match input.interact_text() {
                Ok(raw) => raw,
                Err(_) => return PromptResult::Control(FlowControl::Exit),
            };

            match raw.trim() {
                ":back" => return PromptResult::Control(FlowControl::Back),
                ":retry" => return PromptResult::Control(FlowControl::Retry),
                ":exit" | ":quit" => return PromptResult::Control(FlowControl::Exit),
                _ => {}
            }

            match self.validator.validate(&raw) {
                Ok(value) => {
                    self.recent = Some(Value::String(value.clone()));
                    return PromptResult::Value(Value::String(value));
                }
                Err(err) => {
                    eprintln!("{}", err.message.yellow());
                }
            }
        }
    }

    fn set_steps(&mut self, current: usize, total: usize) {
        self.steps = Some((current, total));
    }

    fn recent_item(&self) -> Option<Value> {
        self.recent.clone()
    }

    fn set_recent_item(&mut self, item: Value) {
        self.recent = Some(item);
    }
}
