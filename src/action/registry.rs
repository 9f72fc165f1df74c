use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{EngineError, Result};
use crate::state::WorldState;

use super::Action;

/// Static catalog of action definitions.
///
/// Populated once at startup and read-only afterwards; planning never
/// mutates it, so it needs no locking. Registration fails fast on a
/// duplicate id, and rejects a parallel-safe action whose effect writes
/// overlap with another parallel-safe action's: actions that can end up in
/// the same batch must touch disjoint keys.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: BTreeMap<String, Action>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a catalog, failing on the first invalid entry.
    pub fn with_actions(actions: impl IntoIterator<Item = Action>) -> Result<Self> {
        let mut registry = Self::new();
        for action in actions {
            registry.register(action)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, action: Action) -> Result<()> {
        if self.actions.contains_key(action.id()) {
            return Err(EngineError::DuplicateAction(action.id().to_string()));
        }

        if action.is_parallel_safe() {
            self.check_conflicts(&action)?;
        }

        debug!(
            action_id = action.id(),
            cost = action.cost(),
            parallel_safe = action.is_parallel_safe(),
            "Registered action"
        );
        self.actions.insert(action.id().to_string(), action);
        Ok(())
    }

    fn check_conflicts(&self, action: &Action) -> Result<()> {
        let writes = action.effect().writes();
        for existing in self.actions.values().filter(|a| a.is_parallel_safe()) {
            if let Some(key) = existing.effect().writes().intersection(&writes).next() {
                return Err(EngineError::EffectConflict {
                    first: existing.id().to_string(),
                    second: action.id().to_string(),
                    key: key.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Action> {
        self.actions.get(id)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.values()
    }

    /// Every action whose precondition holds against the snapshot, ordered
    /// by (cost ascending, id ascending) for reproducible planning.
    pub fn eligible(&self, state: &WorldState) -> Vec<&Action> {
        let mut eligible: Vec<&Action> = self
            .actions
            .values()
            .filter(|a| a.eligible(state))
            .collect();
        eligible.sort_by(|a, b| (a.cost(), a.id()).cmp(&(b.cost(), b.id())));
        eligible
    }
}
