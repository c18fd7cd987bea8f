//! Selection prompter backed by `dialoguer::Select`.

use colored::Colorize;
use dialoguer::Select;
use serde_json::Value;

use crate::flow::control::{FlowControl, PromptResult};
use crate::prompters::{Prompter, StepEstimator};

/// One selectable entry: a display label plus the value it produces.
#[derive(Debug, Clone)]
pub struct PickItem {
    pub label: String,
    pub data: Value,
}

impl PickItem {
    pub fn new(label: impl Into<String>, data: impl Into<Value>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Presents a fixed list of items and resolves to the picked item's data.
///
/// When a step estimator is installed, items that would add further steps
/// are annotated with the count. ESC dismisses the menu without an answer;
/// an optional `← Back` entry is appended for explicit back-navigation.
pub struct PickPrompter {
    title: String,
    items: Vec<PickItem>,
    enable_back: bool,
    recent: Option<Value>,
    steps: Option<(usize, usize)>,
    estimator: Option<StepEstimator>,
}

impl PickPrompter {
    pub fn new(title: impl Into<String>, items: Vec<PickItem>) -> Self {
        Self {
            title: title.into(),
            items,
            enable_back: false,
            recent: None,
            steps: None,
            estimator: None,
        }
    }

    pub fn with_back_entry(mut self) -> Self {
        self.enable_back = true;
        self
    }

    fn title_line(&self) -> String {
        match self.steps {
            Some((current, total)) => format!("Step {} / {} — {}", current, total, self.title),
            None => self.title.clone(),
        }
    }

    fn label_for(&self, item: &PickItem) -> String {
        let extra = self
            .estimator
            .as_ref()
            .map_or(0, |estimator| estimator(&PromptResult::Value(item.data.clone())));
        if extra > 0 {
            format!("{}  (+{} steps)", item.label, extra)
        } else {
            item.label.clone()
        }
    }
}

impl Prompter for PickPrompter {
    fn prompt(&mut self) -> PromptResult<Value> {
        if self.items.is_empty() {
            return PromptResult::NoAnswer;
        }

        let mut labels: Vec<String> = self.items.iter().map(|item| self.label_for(item)).collect();
        if self.enable_back {
            labels.push("← Back".to_string());
        }

        let default = self
            .recent
            .as_ref()
            .and_then(|recent| self.items.iter().position(|item| &item.data == recent))
            .unwrap_or(0);

        let selection = Select::new()
            .with_prompt(self.title_line().bold().to_string())
            .items(&labels)
            .default(default)
            .interact_opt();

        match selection {
            Ok(Some(index)) if index < self.items.len() => {
                let data = self.items[index].data.clone();
                self.recent = Some(data.clone());
                PromptResult::Value(data)
            }
            // The appended entry is the Back affordance.
            Ok(Some(_)) => PromptResult::Control(FlowControl::Back),
            Ok(None) => PromptResult::NoAnswer,
            Err(_) => PromptResult::Control(FlowControl::Exit),
        }
    }

    fn set_steps(&mut self, current: usize, total: usize) {
        self.steps = Some((current, total));
    }

    fn set_step_estimator(&mut self, estimator: StepEstimator) {
        self.estimator = Some(estimator);
    }

    fn recent_item(&self) -> Option<Value> {
        self.recent.clone()
    }

    fn set_recent_item(&mut self, item: Value) {
        self.recent = Some(item);
    }
}
