use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::debug;

use crate::action::Effect;
use crate::error::Result;

use super::value::Value;
use super::world::{WorldSchema, WorldState};

/// The live world-state store.
///
/// All mutation funnels through a single write lock, so concurrent batch
/// members never interleave partial writes. Effects are applied as a
/// transaction: every write is validated against the schema first, then the
/// full effect commits, or nothing does. Observers receive a post-mutation
/// snapshot through a watch channel.
pub struct WorldStore {
    schema: WorldSchema,
    state: RwLock<WorldState>,
    tx: watch::Sender<WorldState>,
}

impl WorldStore {
    /// Create a store from an initial snapshot, deriving the schema from
    /// the kinds of the initial values.
    pub fn new(initial: WorldState) -> Self {
        let schema = WorldSchema::from_state(&initial);
        Self::with_schema(initial, schema)
    }

    pub fn with_schema(initial: WorldState, schema: WorldSchema) -> Self {
        let (tx, _) = watch::channel(initial.clone());
        Self {
            schema,
            state: RwLock::new(initial),
            tx,
        }
    }

    pub fn schema(&self) -> &WorldSchema {
        &self.schema
    }

    /// Immutable snapshot of the current state.
    pub fn snapshot(&self) -> WorldState {
        self.state.read().clone()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.state.read().get(key).cloned()
    }

    /// Validated single-key write.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.schema.check(key, &value)?;

        let mut guard = self.state.write();
        guard.insert(key.to_string(), value);
        self.tx.send_replace(guard.clone());
        Ok(())
    }

    /// Apply an action effect as one atomic transaction.
    ///
    /// Every write in the effect is validated before any of them commits;
    /// on a validation error the store is left unchanged. Returns the
    /// post-effect snapshot.
    pub fn apply(&self, effect: &Effect) -> Result<WorldState> {
        let mut guard = self.state.write();
        effect.validate(&self.schema)?;

        let next = effect.apply(&guard);
        *guard = next.clone();
        self.tx.send_replace(next.clone());
        debug!(writes = effect.len(), "Applied effect to world state");
        Ok(next)
    }

    /// Subscribe to post-mutation snapshots.
    pub fn subscribe(&self) -> watch::Receiver<WorldState> {
        self.tx.subscribe()
    }
}
