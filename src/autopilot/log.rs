use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::executor::{ActionRecord, ExecOutcome};
use crate::state::WorldState;

/// Outcome recorded in one log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryOutcome {
    BackendSuccess,
    FallbackSuccess,
    /// Synthetic plan-only entry: planning found the goal satisfied.
    GoalSatisfied,
    /// Synthetic plan-only entry: no eligible action.
    Blocked,
}

/// One append-only record of a planning decision or execution outcome.
///
/// Consumed by observers (UI, metrics); not required for engine
/// correctness. `action_id` is absent for synthetic plan-only entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    pub cycle: u32,
    pub action_id: Option<String>,
    pub outcome: EntryOutcome,
    pub retries_attempted: u32,
    pub state_before: WorldState,
    pub state_after: WorldState,
}

impl ExecutionLogEntry {
    pub fn from_record(cycle: u32, record: &ActionRecord) -> Self {
        let outcome = match record.outcome {
            ExecOutcome::Backend => EntryOutcome::BackendSuccess,
            ExecOutcome::Fallback => EntryOutcome::FallbackSuccess,
        };
        Self {
            id: Uuid::new_v4(),
            at: Utc::now(),
            cycle,
            action_id: Some(record.action_id.clone()),
            outcome,
            retries_attempted: record.retries_attempted,
            state_before: record.state_before.clone(),
            state_after: record.state_after.clone(),
        }
    }

    pub fn plan_only(cycle: u32, outcome: EntryOutcome, state: WorldState) -> Self {
        Self {
            id: Uuid::new_v4(),
            at: Utc::now(),
            cycle,
            action_id: None,
            outcome,
            retries_attempted: 0,
            state_before: state.clone(),
            state_after: state,
        }
    }
}

/// Append-only execution log.
///
/// Single-writer discipline: only the autopilot (and the batch tasks it
/// spawns) append. Batch entries land in actual completion order, which is
/// what observers want to see. Readers get clones; there is no way to
/// mutate history through this type.
#[derive(Debug, Default)]
pub struct ExecutionLog {
    entries: RwLock<Vec<ExecutionLogEntry>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, entry: ExecutionLogEntry) {
        self.entries.write().push(entry);
    }

    pub fn entries(&self) -> Vec<ExecutionLogEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
