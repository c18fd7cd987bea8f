//! Multi-step wizard engine: control signals, state machine controller,
//! declarative form bindings, and the wizard run loop.

pub mod control;
pub mod form;
pub mod machine;
pub mod schema;
pub mod state;
pub mod wizard;

pub use control::{FlowControl, PromptResult};
pub use form::{BindContext, Binding, FormBuilder, PrompterProvider, WizardForm};
pub use machine::{
    ControlSignal, MachineContext, MachineStep, StateMachineController, StepKey, StepResult,
};
pub use schema::{FormSchema, PropertyKind};
pub use state::FlowState;
pub use wizard::Wizard;
