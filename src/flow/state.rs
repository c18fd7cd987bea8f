//! Partially-filled wizard state addressed by dotted property paths.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::errors::FlowError;

/// Working state accumulated by a wizard run.
///
/// Values live in a JSON object tree and are addressed by dotted paths such
/// as `"destination.region"`. Cloning is a deep copy, which is what the
/// speculative step estimator relies on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowState {
    root: Map<String, Value>,
}

impl FlowState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a state from a JSON value; anything but an object is rejected.
    pub fn from_value(value: Value) -> Result<Self, FlowError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(FlowError::InvalidState(format!(
                "state root must be an object, got {}",
                other
            ))),
        }
    }

    /// Returns the value at `path`, if present.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Convenience accessor for string-valued properties.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Sets the value at `path`, creating intermediate objects as needed.
    /// An intermediate non-object value is replaced by an object.
    pub fn set(&mut self, path: &str, value: Value) {
        let mut segments: Vec<&str> = path.split('.').collect();
        let leaf = match segments.pop() {
            Some(leaf) => leaf,
            None => return,
        };

        let mut current = &mut self.root;
        for segment in segments {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            current = match entry.as_object_mut() {
                Some(map) => map,
                None => return,
            };
        }
        current.insert(leaf.to_string(), value);
    }

    /// Removes the value at `path`, if present.
    pub fn unset(&mut self, path: &str) {
        let mut segments: Vec<&str> = path.split('.').collect();
        let leaf = match segments.pop() {
            Some(leaf) => leaf,
            None => return,
        };

        let mut current = &mut self.root;
        for segment in segments {
            current = match current.get_mut(segment).and_then(Value::as_object_mut) {
                Some(map) => map,
                None => return,
            };
        }
        current.remove(leaf);
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Consumes the state, yielding the underlying JSON object.
    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }

    /// Deserializes the collected state into a caller-defined output type.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, FlowError> {
        Ok(serde_json::from_value(self.into_value())?)
    }
}
