//! Generic state machine that drives ordered steps with back, retry, and
//! exit handling.
//!
//! The controller performs no I/O and knows nothing about prompters; it only
//! sequences abstract steps. Each executed step is remembered together with
//! a snapshot of the state it started from, so back-navigation restores both
//! the step and its pre-execution state.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;

/// Machine-level signal a step may attach to its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// Re-run the same step without advancing history.
    Retry,
    /// Rewind one executed step, discarding the current step's changes.
    Back,
    /// Terminate the run immediately with no result.
    Exit,
}

/// Identity of a step.
///
/// Steps are compared by key, never by closure identity, so duplicate
/// suppression works across re-created step objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StepKey {
    /// A step bound to a property path; `link` distinguishes chained links.
    Property { path: String, link: usize },
    /// The exit-confirmation step.
    ExitConfirmation,
}

impl StepKey {
    pub fn property(path: impl Into<String>) -> Self {
        StepKey::Property {
            path: path.into(),
            link: 0,
        }
    }

    pub fn link(path: impl Into<String>, link: usize) -> Self {
        StepKey::Property {
            path: path.into(),
            link,
        }
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKey::Property { path, link: 0 } => write!(f, "{}", path),
            StepKey::Property { path, link } => write!(f, "{}#{}", path, link),
            StepKey::ExitConfirmation => write!(f, "exit-confirmation"),
        }
    }
}

/// Outcome of executing a single step.
pub struct StepResult<S> {
    /// State after the step; unchanged when the step produced no answer.
    pub next_state: S,
    /// Follow-up steps to run next, ahead of previously queued work.
    pub next_steps: Vec<MachineStep<S>>,
    /// Optional flow-control request.
    pub control: Option<ControlSignal>,
    /// Re-run this step next without pushing it onto history.
    pub repeat: bool,
}

impl<S> StepResult<S> {
    /// A successful step: state advances, history records the step.
    pub fn advance(next_state: S) -> Self {
        Self {
            next_state,
            next_steps: Vec::new(),
            control: None,
            repeat: false,
        }
    }

    /// A step that requests flow control instead of advancing.
    pub fn signal(next_state: S, control: ControlSignal) -> Self {
        Self {
            next_state,
            next_steps: Vec::new(),
            control: Some(control),
            repeat: false,
        }
    }

    pub fn with_steps(mut self, steps: Vec<MachineStep<S>>) -> Self {
        self.next_steps = steps;
        self
    }

    pub fn and_repeat(mut self) -> Self {
        self.repeat = true;
        self
    }
}

type StepFn<S> = Rc<dyn Fn(&MachineContext, S) -> StepResult<S>>;

/// A unit of work owned by the controller, identified by its [`StepKey`].
#[derive(Clone)]
pub struct MachineStep<S> {
    key: StepKey,
    run: StepFn<S>,
}

impl<S> MachineStep<S> {
    pub fn new(key: StepKey, run: impl Fn(&MachineContext, S) -> StepResult<S> + 'static) -> Self {
        Self {
            key,
            run: Rc::new(run),
        }
    }

    pub fn key(&self) -> &StepKey {
        &self.key
    }
}

/// Read-only view of the controller handed to each executing step.
pub struct MachineContext {
    current_step: usize,
    total_steps: usize,
    seen: HashSet<StepKey>,
}

impl MachineContext {
    /// 1-based position of the executing step.
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Estimated total step count; may change as new information arrives.
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Keys of every step currently pending or already executed, the
    /// executing step included.
    pub fn seen(&self) -> &HashSet<StepKey> {
        &self.seen
    }

    pub fn contains_step(&self, key: &StepKey) -> bool {
        self.seen.contains(key)
    }
}

struct HistoryEntry<S> {
    step: MachineStep<S>,
    snapshot: S,
}

/// Drives queued steps one at a time until the queue drains or the user
/// backs out of the first step or exits.
pub struct StateMachineController<S: Clone> {
    pending: VecDeque<MachineStep<S>>,
    history: Vec<HistoryEntry<S>>,
    state: S,
    executing: bool,
}

impl<S: Clone> StateMachineController<S> {
    pub fn new(initial: S) -> Self {
        Self {
            pending: VecDeque::new(),
            history: Vec::new(),
            state: initial,
            executing: false,
        }
    }

    /// Enqueues a step unless one with the same key is pending or executed.
    pub fn add_step(&mut self, step: MachineStep<S>) {
        if !self.contains_step(step.key()) {
            self.pending.push_back(step);
        }
    }

    /// Identity check against both the pending queue and executed history.
    pub fn contains_step(&self, key: &StepKey) -> bool {
        self.pending.iter().any(|step| step.key() == key)
            || self.history.iter().any(|entry| entry.step.key() == key)
    }

    /// 1-based position while a step runs; executed count otherwise.
    pub fn current_step(&self) -> usize {
        self.history.len() + usize::from(self.executing)
    }

    /// Current position plus remaining queued work.
    pub fn total_steps(&self) -> usize {
        self.current_step() + self.pending.len()
    }

    fn insert_front(&mut self, step: MachineStep<S>) {
        if !self.contains_step(step.key()) {
            self.pending.push_front(step);
        }
    }

    fn context(&self, current: &MachineStep<S>) -> MachineContext {
        let mut seen: HashSet<StepKey> = self.pending.iter().map(|s| s.key().clone()).collect();
        seen.extend(self.history.iter().map(|e| e.step.key().clone()));
        seen.insert(current.key().clone());
        MachineContext {
            current_step: self.history.len() + 1,
            total_steps: self.history.len() + 1 + self.pending.len(),
            seen,
        }
    }

    /// Executes steps until the pending queue is empty.
    ///
    /// Returns `None` when the user exits or backs out of the first step.
    ///
    /// # Panics
    ///
    /// Panics if a step signals [`ControlSignal::Exit`] while also
    /// requesting follow-up steps; that is a contract violation by the step
    /// author.
    pub fn run(&mut self) -> Option<S> {
        while let Some(step) = self.pending.pop_front() {
            let snapshot = self.state.clone();
            self.executing = true;
            let ctx = self.context(&step);
            tracing::debug!(step = %step.key(), current = ctx.current_step, "executing step");
            let result = (step.run)(&ctx, self.state.clone());
            self.executing = false;

            match result.control {
                Some(ControlSignal::Exit) => {
                    assert!(
                        result.next_steps.is_empty(),
                        "step `{}` signalled Exit while requesting follow-up steps",
                        step.key()
                    );
                    tracing::debug!(step = %step.key(), "flow exited");
                    return None;
                }
                Some(ControlSignal::Back) => match self.history.pop() {
                    // The current step is discarded; whoever produced it is
                    // expected to re-resolve it from the rewound state.
                    Some(previous) => {
                        tracing::debug!(from = %step.key(), to = %previous.step.key(), "stepping back");
                        self.state = previous.snapshot;
                        self.pending.push_front(previous.step);
                    }
                    None => {
                        tracing::debug!(step = %step.key(), "backed out of the first step");
                        return None;
                    }
                },
                Some(ControlSignal::Retry) => {
                    self.state = snapshot;
                    self.pending.push_front(step);
                }
                None => {
                    self.state = result.next_state;
                    for next in result.next_steps.into_iter().rev() {
                        self.insert_front(next);
                    }
                    if result.repeat {
                        self.pending.push_front(step);
                    } else {
                        self.history.push(HistoryEntry { step, snapshot });
                    }
                }
            }
        }
        Some(self.state.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    type State = Vec<&'static str>;

    fn recording_step(name: &'static str, log: Rc<RefCell<Vec<usize>>>) -> MachineStep<State> {
        MachineStep::new(StepKey::property(name), move |ctx, mut state: State| {
            log.borrow_mut().push(ctx.current_step());
            state.push(name);
            StepResult::advance(state)
        })
    }

    fn scripted_step(
        name: &'static str,
        script: Rc<RefCell<VecDeque<Option<ControlSignal>>>>,
    ) -> MachineStep<State> {
        MachineStep::new(StepKey::property(name), move |_ctx, mut state: State| {
            match script.borrow_mut().pop_front().flatten() {
                Some(control) => StepResult::signal(state, control),
                None => {
                    state.push(name);
                    StepResult::advance(state)
                }
            }
        })
    }

    #[test]
    fn steps_run_in_order_with_monotonic_counters() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut controller = StateMachineController::new(State::new());
        for name in ["a", "b", "c"] {
            controller.add_step(recording_step(name, Rc::clone(&log)));
        }

        let state = controller.run().unwrap();
        assert_eq!(state, vec!["a", "b", "c"]);
        assert_eq!(*log.borrow(), vec![1, 2, 3]);
        assert_eq!(controller.current_step(), 3);
        assert_eq!(controller.total_steps(), 3);
    }

    fn c_step(
        script: Rc<RefCell<VecDeque<Option<ControlSignal>>>>,
        positions: Rc<RefCell<Vec<usize>>>,
    ) -> MachineStep<State> {
        MachineStep::new(StepKey::property("c"), move |ctx, mut state: State| {
            positions.borrow_mut().push(ctx.current_step());
            match script.borrow_mut().pop_front().flatten() {
                Some(control) => StepResult::signal(state, control),
                None => {
                    state.push("c");
                    StepResult::advance(state)
                }
            }
        })
    }

    #[test]
    fn back_rewinds_exactly_one_step() {
        let log = Rc::new(RefCell::new(Vec::new()));
        // c answers Back once, then succeeds.
        let script = Rc::new(RefCell::new(VecDeque::from([
            Some(ControlSignal::Back),
            None,
        ])));
        let positions = Rc::new(RefCell::new(Vec::new()));

        let mut controller = StateMachineController::new(State::new());
        controller.add_step(recording_step("a", Rc::clone(&log)));
        // b re-creates c when it is missing, the way a wizard re-resolves
        // its remaining steps after a rewind.
        let b_log = Rc::clone(&log);
        let b_script = Rc::clone(&script);
        let b_positions = Rc::clone(&positions);
        controller.add_step(MachineStep::new(StepKey::property("b"), move |ctx, mut state: State| {
            b_log.borrow_mut().push(ctx.current_step());
            state.push("b");
            let mut follow = Vec::new();
            if !ctx.contains_step(&StepKey::property("c")) {
                follow.push(c_step(Rc::clone(&b_script), Rc::clone(&b_positions)));
            }
            StepResult::advance(state).with_steps(follow)
        }));
        controller.add_step(c_step(Rc::clone(&script), Rc::clone(&positions)));

        let state = controller.run().unwrap();
        // b re-ran at position 2 after the back from c at position 3, and
        // the state change made by the first b run was discarded.
        assert_eq!(*log.borrow(), vec![1, 2, 2]);
        assert_eq!(*positions.borrow(), vec![3, 3]);
        assert_eq!(state, vec!["a", "b", "c"]);
    }

    #[test]
    fn retry_is_step_neutral() {
        let script = Rc::new(RefCell::new(VecDeque::from([
            Some(ControlSignal::Retry),
            Some(ControlSignal::Retry),
            None,
        ])));
        let mut controller = StateMachineController::new(State::new());
        controller.add_step(scripted_step("a", Rc::clone(&script)));
        controller.add_step(scripted_step("b", Rc::new(RefCell::new(VecDeque::new()))));

        let state = controller.run().unwrap();
        assert_eq!(state, vec!["a", "b"]);
        assert_eq!(controller.current_step(), 2);
    }

    #[test]
    fn exit_terminates_with_no_result() {
        let script = Rc::new(RefCell::new(VecDeque::from([Some(ControlSignal::Exit)])));
        let mut controller = StateMachineController::new(State::new());
        controller.add_step(scripted_step("a", Rc::new(RefCell::new(VecDeque::new()))));
        controller.add_step(scripted_step("b", Rc::clone(&script)));

        assert!(controller.run().is_none());
    }

    #[test]
    fn back_past_the_first_step_returns_no_result() {
        let script = Rc::new(RefCell::new(VecDeque::from([Some(ControlSignal::Back)])));
        let mut controller = StateMachineController::new(State::new());
        controller.add_step(scripted_step("a", script));

        assert!(controller.run().is_none());
    }

    #[test]
    fn duplicate_steps_are_suppressed() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut controller = StateMachineController::new(State::new());
        controller.add_step(recording_step("a", Rc::clone(&log)));
        controller.add_step(recording_step("a", Rc::clone(&log)));

        let state = controller.run().unwrap();
        assert_eq!(state, vec!["a"]);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn follow_up_steps_run_immediately_next() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut controller = StateMachineController::new(State::new());
        let revealed = recording_step("revealed", Rc::clone(&log));
        controller.add_step(MachineStep::new(StepKey::property("a"), move |_ctx, mut state: State| {
            state.push("a");
            StepResult::advance(state).with_steps(vec![revealed.clone()])
        }));
        controller.add_step(recording_step("b", Rc::clone(&log)));

        let state = controller.run().unwrap();
        assert_eq!(state, vec!["a", "revealed", "b"]);
    }

    #[test]
    fn repeat_applies_state_without_advancing_history() {
        let script = Rc::new(RefCell::new(VecDeque::from([true, true, false])));
        let mut controller = StateMachineController::new(State::new());
        controller.add_step(MachineStep::new(StepKey::property("item"), move |_ctx, mut state: State| {
            state.push("item");
            if script.borrow_mut().pop_front().unwrap_or(false) {
                StepResult::advance(state).and_repeat()
            } else {
                StepResult::advance(state)
            }
        }));

        let state = controller.run().unwrap();
        assert_eq!(state, vec!["item", "item", "item"]);
        assert_eq!(controller.current_step(), 1);
    }

    #[test]
    #[should_panic(expected = "signalled Exit while requesting follow-up steps")]
    fn exit_with_follow_ups_is_rejected() {
        let mut controller = StateMachineController::new(State::new());
        controller.add_step(MachineStep::new(StepKey::property("bad"), |_ctx, state| {
            let follow = MachineStep::new(StepKey::property("next"), |_ctx, state| {
                StepResult::advance(state)
            });
            StepResult::signal(state, ControlSignal::Exit).with_steps(vec![follow])
        }));
        controller.run();
    }
}
