//! Form-driven wizard that binds prompters to the state machine controller.
//!
//! A wizard owns an immutable [`WizardForm`] and, on `run`, turns every
//! ready binding into a machine step. Each step obtains a prompter from its
//! provider, shows it, and interprets the response: answers are written to
//! the state and newly revealed steps queue up right behind; control
//! signals translate into the controller's back/retry/exit handling.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use serde_json::Value;

use crate::flow::control::{FlowControl, PromptResult};
use crate::flow::form::{BindContext, WizardForm};
use crate::flow::machine::{
    ControlSignal, MachineContext, MachineStep, StateMachineController, StepKey, StepResult,
};
use crate::flow::state::FlowState;
use crate::prompters::{Prompter, StepEstimator};

/// Per-step storage surviving Back and Retry.
#[derive(Debug, Clone, Default)]
struct StepCache {
    /// Last value the user settled on, restored as the prompter's recent item.
    picked: Option<Value>,
    /// Step offset in effect when this step first ran.
    step_offset: Option<(usize, usize)>,
}

type ExitProvider = Box<dyn Fn(&FlowState) -> Box<dyn Prompter>>;
type ParentEstimator = Box<dyn Fn(&FlowState) -> usize>;

struct WizardCore {
    form: WizardForm,
    implicit: FlowState,
    caches: RefCell<HashMap<StepKey, StepCache>>,
    chained: RefCell<HashMap<String, Value>>,
    counters: Cell<(usize, usize)>,
    step_offset: Cell<(usize, usize)>,
    parent_estimator: Option<ParentEstimator>,
    exit_provider: Option<ExitProvider>,
}

/// Cheap handle to the shared core; step closures hold clones of it.
#[derive(Clone)]
struct Engine {
    core: Rc<WizardCore>,
}

impl Engine {
    fn display_steps(&self) -> (usize, usize) {
        let (current, total) = self.core.counters.get();
        let (offset_current, offset_total) = self.core.step_offset.get();
        (offset_current + current, offset_total + total)
    }

    /// Paths whose binding is unanswered, visible, and not yet a known step.
    fn ready_paths(&self, state: &FlowState, seen: &HashSet<StepKey>) -> Vec<String> {
        let defaulted = self.core.form.apply_defaults(state);
        self.core
            .form
            .bindings()
            .iter()
            .filter(|binding| binding.link_count() > 0)
            .filter(|binding| self.core.form.can_show(binding, state, &defaulted))
            .map(|binding| binding.path().to_string())
            .filter(|path| !seen.contains(&StepKey::property(path.clone())))
            .collect()
    }

    fn resolve_next_steps(
        &self,
        state: &FlowState,
        seen: &HashSet<StepKey>,
    ) -> Vec<MachineStep<FlowState>> {
        self.ready_paths(state, seen)
            .into_iter()
            .map(|path| self.bound_step(path, 0))
            .collect()
    }

    fn bound_step(&self, path: String, link: usize) -> MachineStep<FlowState> {
        let engine = self.clone();
        let key = StepKey::link(path.clone(), link);
        MachineStep::new(key, move |ctx, state| {
            engine.run_bound(ctx, state, &path, link)
        })
    }

    fn exit_step(&self) -> MachineStep<FlowState> {
        let engine = self.clone();
        MachineStep::new(StepKey::ExitConfirmation, move |ctx, state| {
            engine.run_exit(ctx, state)
        })
    }

    fn run_exit(&self, ctx: &MachineContext, state: FlowState) -> StepResult<FlowState> {
        let Some(provider) = self.core.exit_provider.as_ref() else {
            return StepResult::signal(state, ControlSignal::Back);
        };
        self.core
            .counters
            .set((ctx.current_step(), ctx.total_steps()));
        let mut prompter = provider(&state);
        let (current, total) = self.display_steps();
        prompter.set_steps(current, total);

        match prompter.prompt() {
            PromptResult::Value(Value::Bool(true)) => {
                StepResult::signal(state, ControlSignal::Exit)
            }
            _ => StepResult::signal(state, ControlSignal::Back),
        }
    }

    fn run_bound(
        &self,
        ctx: &MachineContext,
        mut state: FlowState,
        path: &str,
        link: usize,
    ) -> StepResult<FlowState> {
        self.core
            .counters
            .set((ctx.current_step(), ctx.total_steps()));
        let Some(binding) = self.core.form.binding(path) else {
            panic!("no binding registered for `{}`", path)
        };
        if let Some(setup) = binding.setup_hook() {
            setup(&state);
        }

        let key = StepKey::link(path.to_string(), link);
        // A nested flow may have advanced the offset; rewind to what this
        // step saw the first time around.
        if let Some(offset) = self
            .core
            .caches
            .borrow()
            .get(&key)
            .and_then(|cache| cache.step_offset)
        {
            self.core.step_offset.set(offset);
        }
        self.core
            .caches
            .borrow_mut()
            .entry(key.clone())
            .or_default()
            .step_offset = Some(self.core.step_offset.get());

        let defaulted = self.core.form.apply_defaults(&state);
        let chained = self.core.chained.borrow().get(path).cloned();
        let bind_ctx = BindContext {
            state: &defaulted,
            chained: chained.as_ref(),
        };
        let Some(provider) = binding.link(link) else {
            panic!("property `{}` has no link {}", path, link)
        };
        let mut prompter = provider(&bind_ctx);

        let (current, total) = self.display_steps();
        prompter.set_steps(current, total);
        prompter.set_step_estimator(self.step_estimator(&state, path, ctx));

        let cached = self
            .core
            .caches
            .borrow()
            .get(&key)
            .and_then(|cache| cache.picked.clone());
        if let Some(picked) = cached {
            prompter.set_recent_item(picked);
        } else if let Some(implied) = self.core.implicit.get(path) {
            prompter.set_recent_item(implied.clone());
        }

        let response = prompter.prompt();

        {
            let mut caches = self.core.caches.borrow_mut();
            let cache = caches.entry(key).or_default();
            if response.is_valid() {
                cache.picked = prompter.recent_item();
            } else {
                cache.step_offset = None;
            }
        }

        // A prompter that ran a nested flow consumed extra steps; fold the
        // excess into the offset.
        let consumed = prompter.total_steps().saturating_sub(1);
        if consumed > 0 {
            let (offset_current, offset_total) = self.core.step_offset.get();
            self.core
                .step_offset
                .set((offset_current + consumed, offset_total + consumed));
        }

        match response {
            PromptResult::Value(value) => {
                tracing::debug!(property = path, "answer recorded");
                state.set(path, value);
                let next = self.resolve_next_steps(&state, ctx.seen());
                StepResult::advance(state).with_steps(next)
            }
            PromptResult::Control(FlowControl::Chain(payload)) => {
                let next_link = link + 1;
                assert!(
                    next_link < binding.link_count(),
                    "property `{}` chained past its final link",
                    path
                );
                tracing::debug!(property = path, link = next_link, "chaining to next link");
                self.core
                    .chained
                    .borrow_mut()
                    .insert(path.to_string(), payload);
                let follow = self.bound_step(path.to_string(), next_link);
                StepResult::advance(state).with_steps(vec![follow])
            }
            PromptResult::Control(FlowControl::Retry) => {
                StepResult::signal(state, ControlSignal::Retry)
            }
            PromptResult::Control(FlowControl::Exit) => {
                if self.core.exit_provider.is_some() {
                    StepResult::advance(state).with_steps(vec![self.exit_step()])
                } else {
                    StepResult::signal(state, ControlSignal::Exit)
                }
            }
            PromptResult::Control(FlowControl::Back) | PromptResult::NoAnswer => {
                StepResult::signal(state, ControlSignal::Back)
            }
        }
    }

    /// Builds the speculative estimator handed to a prompter: it writes the
    /// hypothetical response into a deep copy of the state and counts the
    /// steps that copy would still require. Real state is never touched.
    fn step_estimator(
        &self,
        state: &FlowState,
        path: &str,
        ctx: &MachineContext,
    ) -> StepEstimator {
        let engine = self.clone();
        let snapshot = state.clone();
        let path = path.to_string();
        let seen = ctx.seen().clone();

        Rc::new(move |response: &PromptResult<Value>| {
            let Some(value) = response.value() else {
                return 0;
            };
            let mut hypothetical = snapshot.clone();
            hypothetical.set(&path, value.clone());
            let estimate = engine.ready_paths(&hypothetical, &seen).len();
            let parent = engine
                .core
                .parent_estimator
                .as_ref()
                .map_or(0, |estimator| estimator(&hypothetical));
            estimate + parent
        })
    }

    /// Applies defaults in declaration order, prunes empty composites, and
    /// enforces the all-or-nothing composite invariant.
    fn finalize(&self, state: FlowState) -> FlowState {
        let mut state = self.core.form.apply_defaults(&state);

        let mut composites: Vec<String> = self
            .core
            .form
            .schema()
            .composites()
            .map(str::to_string)
            .collect();
        composites.sort_by_key(|path| std::cmp::Reverse(path.matches('.').count()));

        for path in &composites {
            if let Some(Value::Object(map)) = state.get(path) {
                if map.is_empty() {
                    state.unset(path);
                }
            }
        }

        for path in &composites {
            let Some(value) = state.get(path) else {
                continue;
            };
            assert!(
                value.is_object(),
                "composite property `{}` holds a non-object value",
                path
            );
            let prefix = format!("{}.", path);
            let missing: Vec<&str> = self
                .core
                .form
                .bindings()
                .iter()
                .filter(|binding| binding.path().starts_with(&prefix))
                .filter(|binding| self.core.form.can_show(binding, &state, &state))
                .map(|binding| binding.path())
                .collect();
            assert!(
                missing.is_empty(),
                "composite property `{}` is partially populated (missing {:?})",
                path,
                missing
            );
        }

        state
    }
}

/// A form-driven wizard producing a fully-resolved [`FlowState`], or `None`
/// when the user exits or backs out of the first step.
pub struct Wizard {
    form: Option<WizardForm>,
    initial: FlowState,
    implicit: FlowState,
    exit_provider: Option<ExitProvider>,
    parent_estimator: Option<ParentEstimator>,
    step_offset: (usize, usize),
    core: Option<Rc<WizardCore>>,
}

impl Wizard {
    pub fn new(form: WizardForm) -> Self {
        Self {
            form: Some(form),
            initial: FlowState::new(),
            implicit: FlowState::new(),
            exit_provider: None,
            parent_estimator: None,
            step_offset: (0, 0),
            core: None,
        }
    }

    /// Starts from a caller-supplied partial state; properties already
    /// present are never prompted.
    pub fn with_initial_state(mut self, state: FlowState) -> Self {
        self.initial = state;
        self
    }

    /// Values surfaced to prompters as the pre-selected recent item without
    /// being written to state.
    pub fn with_implicit_state(mut self, state: FlowState) -> Self {
        self.implicit = state;
        self
    }

    /// Confirmation prompter shown when the user asks to exit; answering
    /// `true` aborts the flow, anything else resumes the interrupted step.
    pub fn with_exit_prompter(
        mut self,
        provider: impl Fn(&FlowState) -> Box<dyn Prompter> + 'static,
    ) -> Self {
        self.exit_provider = Some(Box::new(provider));
        self
    }

    /// Offset applied to both step counters; useful when the wizard is part
    /// of some overarching flow.
    pub fn with_step_offset(mut self, offset: (usize, usize)) -> Self {
        self.set_step_offset(offset);
        self
    }

    /// Composes an outer flow's estimate into this wizard's step estimator.
    pub fn with_parent_estimator(
        mut self,
        estimator: impl Fn(&FlowState) -> usize + 'static,
    ) -> Self {
        self.set_parent_estimator(estimator);
        self
    }

    pub fn set_step_offset(&mut self, offset: (usize, usize)) {
        self.step_offset = offset;
        if let Some(core) = &self.core {
            core.step_offset.set(offset);
        }
    }

    pub fn set_parent_estimator(&mut self, estimator: impl Fn(&FlowState) -> usize + 'static) {
        self.parent_estimator = Some(Box::new(estimator));
    }

    /// 1-based position of the running step, offset included.
    pub fn current_step(&self) -> usize {
        match &self.core {
            Some(core) => core.step_offset.get().0 + core.counters.get().0,
            None => self.step_offset.0,
        }
    }

    /// Estimated total step count, offset included.
    pub fn total_steps(&self) -> usize {
        match &self.core {
            Some(core) => core.step_offset.get().1 + core.counters.get().1,
            None => self.step_offset.1,
        }
    }

    /// Number of steps executed so far, without any offset.
    pub fn steps_taken(&self) -> usize {
        self.core.as_ref().map_or(0, |core| core.counters.get().0)
    }

    /// Drives the flow until every required property is filled or the user
    /// exits. Still-unset properties receive their default values; composite
    /// properties come out fully populated or entirely absent.
    ///
    /// # Panics
    ///
    /// Panics when called a second time; a wizard's form is consumed by the
    /// first run.
    pub fn run(&mut self) -> Option<FlowState> {
        let Some(form) = self.form.take() else {
            panic!("`Wizard::run` may only be called once per wizard")
        };
        let core = Rc::new(WizardCore {
            form,
            implicit: std::mem::take(&mut self.implicit),
            caches: RefCell::new(HashMap::new()),
            chained: RefCell::new(HashMap::new()),
            counters: Cell::new((0, 0)),
            step_offset: Cell::new(self.step_offset),
            parent_estimator: self.parent_estimator.take(),
            exit_provider: self.exit_provider.take(),
        });
        self.core = Some(Rc::clone(&core));
        let engine = Engine { core };

        let mut controller = StateMachineController::new(self.initial.clone());
        for step in engine.resolve_next_steps(&self.initial, &HashSet::new()) {
            controller.add_step(step);
        }

        let state = controller.run()?;
        Some(engine.finalize(state))
    }
}
