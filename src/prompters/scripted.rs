//! Scripted prompter used by tests and the CLI script mode.
//!
//! A [`ScriptSource`] holds responses consumed in prompt order; every
//! prompter cloned from it drains the same queue, which matches how a
//! scripted session answers whichever prompt comes next.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde_json::Value;

use crate::flow::control::{FlowControl, PromptResult};
use crate::prompters::Prompter;

/// Shared queue of scripted responses.
#[derive(Clone, Default)]
pub struct ScriptSource {
    queue: Rc<RefCell<VecDeque<PromptResult<Value>>>>,
}

impl ScriptSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses one response per line: `:back`, `:retry`, `:exit`, and
    /// `:none` map to controls, `:yes`/`:no` to boolean values, and
    /// anything else is a string value.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let source = Self::new();
        for line in lines {
            source.push(parse_line(line.as_ref()));
        }
        source
    }

    pub fn push(&self, response: PromptResult<Value>) {
        self.queue.borrow_mut().push_back(response);
    }

    pub fn push_value(&self, value: impl Into<Value>) {
        self.push(PromptResult::Value(value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    fn pop(&self) -> Option<PromptResult<Value>> {
        self.queue.borrow_mut().pop_front()
    }
}

fn parse_line(line: &str) -> PromptResult<Value> {
    match line.trim() {
        ":back" => PromptResult::Control(FlowControl::Back),
        ":retry" => PromptResult::Control(FlowControl::Retry),
        ":exit" | ":quit" => PromptResult::Control(FlowControl::Exit),
        ":none" => PromptResult::NoAnswer,
        ":yes" => PromptResult::Value(Value::Bool(true)),
        ":no" => PromptResult::Value(Value::Bool(false)),
        value => PromptResult::Value(Value::String(value.to_string())),
    }
}

/// Prompter that answers from a [`ScriptSource`] without touching the
/// terminal. A drained script answers Exit so a truncated session cannot
/// hang a flow.
pub struct ScriptedPrompter {
    source: ScriptSource,
    recent: Option<Value>,
}

impl ScriptedPrompter {
    pub fn new(source: ScriptSource) -> Self {
        Self {
            source,
            recent: None,
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt(&mut self) -> PromptResult<Value> {
        match self.source.pop() {
            Some(response) => {
                if let PromptResult::Value(value) = &response {
                    self.recent = Some(value.clone());
                }
                response
            }
            None => PromptResult::Control(FlowControl::Exit),
        }
    }

    fn recent_item(&self) -> Option<Value> {
        self.recent.clone()
    }

    fn set_recent_item(&mut self, item: Value) {
        self.recent = Some(item);
    }
}
