use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

use super::value::{Value, ValueKind};

/// An immutable snapshot of project facts.
///
/// Snapshots are plain values: cloning one is cheap enough for planning
/// cycles, and mutating a clone never affects the live store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldState {
    values: BTreeMap<String, Value>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, used when assembling an initial snapshot.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Boolean fact lookup. Missing or non-bool keys read as `false`.
    pub fn flag(&self, key: &str) -> bool {
        self.values
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Integer fact lookup. Missing or non-int keys read as `0`.
    pub fn int(&self, key: &str) -> i64 {
        self.values.get(key).and_then(Value::as_int).unwrap_or(0)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_text)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn insert(&mut self, key: String, value: Value) {
        self.values.insert(key, value);
    }
}

/// Declared key -> kind map for a project session.
///
/// All writes to the live store are validated against the schema: unknown
/// keys and kind mismatches are rejected with a validation error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldSchema {
    kinds: BTreeMap<String, ValueKind>,
}

impl WorldSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a schema from an initial snapshot: each key is typed by the
    /// kind of its initial value.
    pub fn from_state(state: &WorldState) -> Self {
        let kinds = state
            .iter()
            .map(|(k, v)| (k.to_string(), v.kind()))
            .collect();
        Self { kinds }
    }

    /// Builder-style key declaration.
    pub fn declare(mut self, key: impl Into<String>, kind: ValueKind) -> Self {
        self.kinds.insert(key.into(), kind);
        self
    }

    pub fn kind_of(&self, key: &str) -> Option<ValueKind> {
        self.kinds.get(key).copied()
    }

    /// Validate one write against the schema.
    pub fn check(&self, key: &str, value: &Value) -> Result<()> {
        match self.kinds.get(key) {
            None => Err(EngineError::validation(key, "unknown key")),
            Some(kind) if *kind != value.kind() => Err(EngineError::validation(
                key,
                format!("expected {}, got {}", kind, value.kind()),
            )),
            Some(_) => Ok(()),
        }
    }

    /// Validate an integer increment against the schema.
    pub fn check_int(&self, key: &str) -> Result<()> {
        match self.kinds.get(key) {
            None => Err(EngineError::validation(key, "unknown key")),
            Some(ValueKind::Int) => Ok(()),
            Some(kind) => Err(EngineError::validation(
                key,
                format!("expected int, got {}", kind),
            )),
        }
    }
}
