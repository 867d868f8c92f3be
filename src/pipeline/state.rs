//! Accumulated pipeline state

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::PipelineError;

/// A bound value together with the step that bound it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Binding {
    owner: String,
    value: Value,
}

/// Ordered step-key → value mapping shared by all steps of a run
///
/// A key stays bound to the step that first wrote it; only that step may
/// rebind it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    bindings: IndexMap<String, Binding>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key` on behalf of step `owner`
    pub fn bind(
        &mut self,
        owner: &str,
        key: impl Into<String>,
        value: Value,
    ) -> Result<(), PipelineError> {
        let key = key.into();
        if let Some(existing) = self.bindings.get_mut(&key) {
            if existing.owner != owner {
                return Err(PipelineError::KeyOwned {
                    key,
                    owner: existing.owner.clone(),
                });
            }
            existing.value = value;
            return Ok(());
        }

        self.bindings.insert(
            key,
            Binding {
                owner: owner.to_string(),
                value,
            },
        );
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.bindings.get(key).map(|b| &b.value)
    }

    /// Walk into nested objects, e.g. `["identity", "data", "access_token"]`
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.get(first)?, |value, segment| value.get(*segment))
    }

    /// String at `path`, or `MissingState` naming the dotted path
    pub fn require_str(&self, path: &[&str]) -> Result<&str, PipelineError> {
        self.get_path(path)
            .and_then(Value::as_str)
            .ok_or_else(|| PipelineError::MissingState(path.join(".")))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.bindings.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Plain JSON object of the bound values
    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .bindings
            .iter()
            .map(|(k, b)| (k.clone(), b.value.clone()))
            .collect();
        Value::Object(map)
    }
}
