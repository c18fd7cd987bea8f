//! Property bindings and the immutable wizard form.
//!
//! A [`FormBuilder`] collects bindings and composite declarations, then
//! produces a [`WizardForm`] consumed once by a wizard run. Rebinding a
//! property is a programmer mistake and fails at bind time.

use serde_json::Value;

use crate::flow::schema::{FormSchema, PropertyKind};
use crate::flow::state::FlowState;
use crate::prompters::Prompter;

/// Context handed to a prompter provider when its step executes.
pub struct BindContext<'a> {
    /// Current state with default values applied.
    pub state: &'a FlowState,
    /// Raw response of the previous chained link, if any.
    pub chained: Option<&'a Value>,
}

pub type PrompterProvider = Box<dyn Fn(&BindContext<'_>) -> Box<dyn Prompter>>;
pub(crate) type VisibilityFn = Box<dyn Fn(&FlowState) -> bool>;
pub(crate) type DefaultFn = Box<dyn Fn(&FlowState) -> Option<Value>>;
pub(crate) type SetupFn = Box<dyn Fn(&FlowState)>;

/// Declarative binding of one property path to one or more prompter
/// providers. More than one provider makes the binding chained: each link
/// consumes the previous link's raw response.
pub struct Binding {
    path: String,
    links: Vec<PrompterProvider>,
    show_when: Option<VisibilityFn>,
    default: Option<DefaultFn>,
    setup: Option<SetupFn>,
    require_parent: bool,
}

impl Binding {
    pub fn new(
        path: impl Into<String>,
        provider: impl Fn(&BindContext<'_>) -> Box<dyn Prompter> + 'static,
    ) -> Self {
        Self {
            path: path.into(),
            links: vec![Box::new(provider)],
            show_when: None,
            default: None,
            setup: None,
            require_parent: false,
        }
    }

    /// Binding that never prompts: the property is filled by its default
    /// provider, subject to the same visibility rules as prompted ones.
    pub fn computed(
        path: impl Into<String>,
        default: impl Fn(&FlowState) -> Option<Value> + 'static,
    ) -> Self {
        Self {
            path: path.into(),
            links: Vec::new(),
            show_when: None,
            default: Some(Box::new(default)),
            setup: None,
            require_parent: false,
        }
    }

    /// Appends a chained link consuming the previous link's raw response.
    pub fn then(
        mut self,
        provider: impl Fn(&BindContext<'_>) -> Box<dyn Prompter> + 'static,
    ) -> Self {
        self.links.push(Box::new(provider));
        self
    }

    /// Only prompt while the predicate holds against the defaulted state.
    /// An already-answered property is never re-prompted, even if the
    /// predicate later turns false.
    pub fn with_visibility(mut self, predicate: impl Fn(&FlowState) -> bool + 'static) -> Self {
        self.show_when = Some(Box::new(predicate));
        self
    }

    /// Value injected when the property is still unset at termination, and
    /// surfaced to later prompts through the defaulted state.
    pub fn with_default(mut self, default: impl Fn(&FlowState) -> Option<Value> + 'static) -> Self {
        self.default = Some(Box::new(default));
        self
    }

    /// Hook invoked with the current state just before the prompter is
    /// obtained.
    pub fn with_setup(mut self, setup: impl Fn(&FlowState) + 'static) -> Self {
        self.setup = Some(Box::new(setup));
        self
    }

    /// Only prompt once the parent composite holds at least one value.
    pub fn with_parent_required(mut self) -> Self {
        self.require_parent = true;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn link(&self, index: usize) -> Option<&PrompterProvider> {
        self.links.get(index)
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub(crate) fn setup_hook(&self) -> Option<&SetupFn> {
        self.setup.as_ref()
    }

    fn parent_path(&self) -> Option<&str> {
        self.path.rsplit_once('.').map(|(parent, _)| parent)
    }
}

/// Builder producing an immutable [`WizardForm`].
#[derive(Default)]
pub struct FormBuilder {
    schema: FormSchema,
    bindings: Vec<Binding>,
}

impl FormBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a composite property path.
    pub fn composite(mut self, path: &str) -> Self {
        self.schema.declare(path, PropertyKind::Composite);
        self
    }

    /// Registers a binding.
    ///
    /// # Panics
    ///
    /// Panics when a binding is already registered for the same path;
    /// chained prompts belong in one binding built with [`Binding::then`].
    pub fn bind(mut self, binding: Binding) -> Self {
        assert!(
            !self.bindings.iter().any(|b| b.path == binding.path),
            "property `{}` is already bound",
            binding.path
        );
        self.schema.declare(&binding.path, PropertyKind::Leaf);
        self.bindings.push(binding);
        self
    }

    /// Finalizes the form.
    ///
    /// # Panics
    ///
    /// Panics when a bound path has an ancestor that is not declared
    /// composite, or when a composite has no descendant bindings.
    pub fn build(self) -> WizardForm {
        let bound: Vec<String> = self.bindings.iter().map(|b| b.path.clone()).collect();
        self.schema.validate(&bound);
        WizardForm {
            schema: self.schema,
            bindings: self.bindings,
        }
    }
}

/// Immutable form consumed by a wizard run.
pub struct WizardForm {
    schema: FormSchema,
    bindings: Vec<Binding>,
}

impl WizardForm {
    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub(crate) fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub(crate) fn binding(&self, path: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.path == path)
    }

    /// Bound property paths in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|b| b.path())
    }

    /// True when the property is unanswered, its parent requirement is met,
    /// and its visibility predicate holds against the defaulted state.
    pub(crate) fn can_show(
        &self,
        binding: &Binding,
        state: &FlowState,
        defaulted: &FlowState,
    ) -> bool {
        if state.contains(&binding.path) {
            return false;
        }
        if binding.require_parent {
            let present = binding
                .parent_path()
                .and_then(|parent| state.get(parent))
                .and_then(Value::as_object)
                .is_some_and(|map| !map.is_empty());
            if !present {
                return false;
            }
        }
        binding
            .show_when
            .as_ref()
            .map_or(true, |predicate| predicate(defaulted))
    }

    /// Returns a copy of `state` with default values injected for unset,
    /// visible bound properties, in declaration order. Each default sees
    /// the defaults injected before it.
    pub fn apply_defaults(&self, state: &FlowState) -> FlowState {
        let mut working = state.clone();
        for binding in &self.bindings {
            let Some(default) = binding.default.as_ref() else {
                continue;
            };
            if !self.can_show(binding, &working, &working) {
                continue;
            }
            if let Some(value) = default(&working) {
                working.set(&binding.path, value);
            }
        }
        working
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::control::PromptResult;
    use serde_json::json;

    struct NoopPrompter;

    impl Prompter for NoopPrompter {
        fn prompt(&mut self) -> PromptResult<Value> {
            PromptResult::NoAnswer
        }
    }

    fn provider(_ctx: &BindContext<'_>) -> Box<dyn Prompter> {
        Box::new(NoopPrompter)
    }

    #[test]
    fn builder_produces_an_ordered_form() {
        let form = FormBuilder::new()
            .composite("destination")
            .bind(Binding::new("runtime", provider))
            .bind(Binding::new("destination.region", provider))
            .bind(Binding::new("destination.bucket", provider))
            .build();

        assert_eq!(
            form.properties().collect::<Vec<_>>(),
            vec!["runtime", "destination.region", "destination.bucket"]
        );
        assert!(form.schema().is_composite("destination"));
    }

    #[test]
    #[should_panic(expected = "already bound")]
    fn rebinding_a_property_fails_fast() {
        let _ = FormBuilder::new()
            .bind(Binding::new("runtime", provider))
            .bind(Binding::new("runtime", provider));
    }

    #[test]
    fn chained_links_share_one_binding() {
        let form = FormBuilder::new()
            .bind(Binding::new("registry", provider).then(provider))
            .build();

        let binding = form.binding("registry").unwrap();
        assert_eq!(binding.link_count(), 2);
        assert!(binding.link(1).is_some());
        assert!(binding.link(2).is_none());
    }

    #[test]
    fn visibility_gates_readiness_but_not_answers() {
        let form = FormBuilder::new()
            .bind(Binding::new("runtime", provider))
            .bind(
                Binding::new("dependencyManager", provider)
                    .with_visibility(|state| state.get_str("runtime") == Some("java17")),
            )
            .build();

        let mut state = FlowState::new();
        let binding = form.binding("dependencyManager").unwrap();
        assert!(!form.can_show(binding, &state, &state));

        state.set("runtime", json!("java17"));
        assert!(form.can_show(binding, &state, &state));

        // Answered properties stay answered regardless of visibility.
        state.set("dependencyManager", json!("maven"));
        state.set("runtime", json!("nodejs18.x"));
        assert!(!form.can_show(binding, &state, &state));
        assert_eq!(state.get_str("dependencyManager"), Some("maven"));
    }

    #[test]
    fn defaults_apply_in_declaration_order_and_respect_visibility() {
        let form = FormBuilder::new()
            .bind(Binding::new("name", provider).with_default(|_| Some(json!("demo"))))
            .bind(Binding::new("bucket", provider).with_default(|state| {
                state.get_str("name").map(|name| json!(format!("{name}-artifacts")))
            }))
            .bind(
                Binding::new("dependencyManager", provider)
                    .with_visibility(|state| state.get_str("runtime") == Some("java17"))
                    .with_default(|_| Some(json!("maven"))),
            )
            .build();

        let defaulted = form.apply_defaults(&FlowState::new());
        assert_eq!(defaulted.get_str("name"), Some("demo"));
        assert_eq!(defaulted.get_str("bucket"), Some("demo-artifacts"));
        assert!(!defaulted.contains("dependencyManager"));
    }

    #[test]
    fn parent_requirement_holds_until_the_composite_has_values() {
        let form = FormBuilder::new()
            .composite("destination")
            .bind(Binding::new("destination.region", provider))
            .bind(Binding::new("destination.bucket", provider).with_parent_required())
            .build();

        let mut state = FlowState::new();
        let bucket = form.binding("destination.bucket").unwrap();
        assert!(!form.can_show(bucket, &state, &state));

        state.set("destination.region", json!("eu-west-1"));
        assert!(form.can_show(bucket, &state, &state));
    }
}
