//! Prompter backed by an embedded child wizard.
//!
//! Lets one property of an outer flow be filled by a whole sub-flow: the
//! child's final state becomes the property value, the parent's step
//! counters carry into the child as an offset, and the parent's estimator
//! composes into the child's so progress spans both flows.

use serde_json::Value;

use crate::flow::control::{FlowControl, PromptResult};
use crate::flow::wizard::Wizard;
use crate::prompters::{Prompter, StepEstimator};

/// Runs a child [`Wizard`] as a single prompt of the outer flow.
///
/// A wizard is consumed by its run, so providers must construct a fresh
/// `WizardPrompter` (with a fresh child) on every call, exactly as they
/// construct fresh prompters of any other kind.
pub struct WizardPrompter {
    wizard: Wizard,
    steps_taken: usize,
}

impl WizardPrompter {
    pub fn new(wizard: Wizard) -> Self {
        Self {
            wizard,
            steps_taken: 0,
        }
    }
}

impl Prompter for WizardPrompter {
    fn prompt(&mut self) -> PromptResult<Value> {
        let outcome = self.wizard.run();
        self.steps_taken = self.wizard.steps_taken();
        match outcome {
            Some(state) => PromptResult::Value(state.into_value()),
            // Backing out of the child rewinds one step of the parent.
            None => PromptResult::Control(FlowControl::Back),
        }
    }

    fn set_steps(&mut self, current: usize, total: usize) {
        self.wizard
            .set_step_offset((current.saturating_sub(1), total.saturating_sub(1)));
    }

    fn set_step_estimator(&mut self, estimator: StepEstimator) {
        self.wizard.set_parent_estimator(move |state| {
            estimator(&PromptResult::Value(state.clone().into_value()))
        });
    }

    fn total_steps(&self) -> usize {
        self.steps_taken.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::form::{BindContext, Binding, FormBuilder};
    use crate::prompters::scripted::{ScriptSource, ScriptedPrompter};
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Scripted prompter that records the step positions it was shown.
    struct StepLogPrompter {
        inner: ScriptedPrompter,
        log: Rc<RefCell<Vec<(usize, usize)>>>,
    }

    impl Prompter for StepLogPrompter {
        fn prompt(&mut self) -> PromptResult<Value> {
            self.inner.prompt()
        }

        fn set_steps(&mut self, current: usize, total: usize) {
            self.log.borrow_mut().push((current, total));
        }
    }

    fn child_wizard(
        source: &ScriptSource,
        log: &Rc<RefCell<Vec<(usize, usize)>>>,
    ) -> Wizard {
        let make = |source: ScriptSource, log: Rc<RefCell<Vec<(usize, usize)>>>| {
            move |_ctx: &BindContext<'_>| -> Box<dyn Prompter> {
                Box::new(StepLogPrompter {
                    inner: ScriptedPrompter::new(source.clone()),
                    log: Rc::clone(&log),
                })
            }
        };
        let form = FormBuilder::new()
            .bind(Binding::new("name", make(source.clone(), Rc::clone(log))))
            .bind(Binding::new("runtime", make(source.clone(), Rc::clone(log))))
            .build();
        Wizard::new(form)
    }

    #[test]
    fn child_state_becomes_the_property_value() {
        let source = ScriptSource::from_lines(["acme", "svc", "python3.12"]);
        let child_log = Rc::new(RefCell::new(Vec::new()));

        let owner_source = source.clone();
        let project_source = source.clone();
        let project_log = Rc::clone(&child_log);
        let form = FormBuilder::new()
            .bind(Binding::new("owner", move |_ctx: &BindContext<'_>| {
                Box::new(ScriptedPrompter::new(owner_source.clone())) as Box<dyn Prompter>
            }))
            .bind(Binding::new("project", move |_ctx: &BindContext<'_>| {
                Box::new(WizardPrompter::new(child_wizard(
                    &project_source,
                    &project_log,
                ))) as Box<dyn Prompter>
            }))
            .build();

        let state = Wizard::new(form).run().unwrap();
        assert_eq!(state.get_str("owner"), Some("acme"));
        assert_eq!(
            state.get("project"),
            Some(&json!({"name": "svc", "runtime": "python3.12"}))
        );
        // Child prompts reported positions spanning the outer flow: the
        // child began at the parent's second step.
        assert_eq!(*child_log.borrow(), vec![(2, 3), (3, 3)]);
    }

    #[test]
    fn backing_out_of_the_child_rewinds_the_parent() {
        let source =
            ScriptSource::from_lines(["first-owner", ":back", "second-owner", "svc", "go1.x"]);
        let child_log = Rc::new(RefCell::new(Vec::new()));

        let owner_source = source.clone();
        let project_source = source.clone();
        let project_log = Rc::clone(&child_log);
        let form = FormBuilder::new()
            .bind(Binding::new("owner", move |_ctx: &BindContext<'_>| {
                Box::new(ScriptedPrompter::new(owner_source.clone())) as Box<dyn Prompter>
            }))
            .bind(Binding::new("project", move |_ctx: &BindContext<'_>| {
                Box::new(WizardPrompter::new(child_wizard(
                    &project_source,
                    &project_log,
                ))) as Box<dyn Prompter>
            }))
            .build();

        let state = Wizard::new(form).run().unwrap();
        assert_eq!(state.get_str("owner"), Some("second-owner"));
        assert_eq!(state.get_str("project.name"), Some("svc"));
        assert_eq!(state.get_str("project.runtime"), Some("go1.x"));
    }
}
