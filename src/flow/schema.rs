//! Explicit schema declarations for wizard properties.
//!
//! Property shapes are declared up front rather than inferred from runtime
//! values: a path is either a leaf (filled by one binding, possibly
//! chained) or a composite (an object whose descendants carry their own
//! bindings and which is populated all-or-nothing).

/// Shape of a declared property path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Leaf,
    Composite,
}

/// Statically declared property paths, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct FormSchema {
    entries: Vec<(String, PropertyKind)>,
}

impl FormSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `path` with the given kind.
    ///
    /// # Panics
    ///
    /// Panics when `path` was already declared with a different kind.
    pub(crate) fn declare(&mut self, path: &str, kind: PropertyKind) {
        match self.kind_of(path) {
            Some(existing) if existing != kind => {
                panic!("property `{}` declared as both {:?} and {:?}", path, existing, kind)
            }
            Some(_) => {}
            None => self.entries.push((path.to_string(), kind)),
        }
    }

    pub fn kind_of(&self, path: &str) -> Option<PropertyKind> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == path)
            .map(|(_, kind)| *kind)
    }

    pub fn is_composite(&self, path: &str) -> bool {
        self.kind_of(path) == Some(PropertyKind::Composite)
    }

    /// Declared composite paths, in declaration order.
    pub fn composites(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, kind)| *kind == PropertyKind::Composite)
            .map(|(path, _)| path.as_str())
    }

    /// Checks the schema against the set of bound leaf paths.
    ///
    /// # Panics
    ///
    /// Panics when a bound path has an ancestor that is not declared
    /// composite, or when a composite has no bound descendant.
    pub(crate) fn validate(&self, bound: &[String]) {
        for path in bound {
            let mut ancestor = String::new();
            for segment in path.split('.').take(path.split('.').count() - 1) {
                if !ancestor.is_empty() {
                    ancestor.push('.');
                }
                ancestor.push_str(segment);
                assert!(
                    self.is_composite(&ancestor),
                    "binding `{}` requires `{}` to be declared composite",
                    path,
                    ancestor
                );
            }
        }

        for composite in self.composites() {
            let prefix = format!("{}.", composite);
            assert!(
                bound.iter().any(|path| path.starts_with(&prefix)),
                "composite `{}` has no descendant bindings",
                composite
            );
        }
    }
}
