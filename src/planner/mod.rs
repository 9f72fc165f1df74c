//! Plan computation.
//!
//! The planner reads an immutable snapshot plus the action registry and
//! returns the next unit of work. It never mutates anything and never
//! randomizes: eligibility ordering is (cost ascending, id ascending), so
//! the same inputs always produce the same plan.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::{ActionRegistry, Predicate};
use crate::state::WorldState;

/// Execution strategy for one planning cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
    /// One lowest-cost eligible action per cycle.
    Single,
    /// All eligible parallel-safe actions at once; serial-only actions are
    /// ignored rather than silently run serially.
    Parallel,
    /// Serial actions drain first, one per cycle; once only parallel-safe
    /// actions remain, batch them.
    #[default]
    Hybrid,
}

impl fmt::Display for PlanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Single => "single",
            Self::Parallel => "parallel",
            Self::Hybrid => "hybrid",
        };
        write!(f, "{}", s)
    }
}

/// A caller-declared goal: a named pure predicate over world state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    name: String,
    predicate: Predicate,
}

impl Goal {
    pub fn new(name: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn satisfied(&self, state: &WorldState) -> bool {
        self.predicate.eval(state)
    }
}

/// The planner's chosen unit of work for one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    /// Run one action synchronously.
    Single(String),
    /// Run all named actions concurrently; every member is parallel-safe
    /// with registration-checked disjoint effects.
    Batch(Vec<String>),
    /// No unit of work. `goal_satisfied` distinguishes terminal success
    /// from a genuinely stuck state.
    Blocked { goal_satisfied: bool },
}

impl Plan {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }

    /// Action ids in this plan, in planning order.
    pub fn action_ids(&self) -> Vec<&str> {
        match self {
            Self::Single(id) => vec![id.as_str()],
            Self::Batch(ids) => ids.iter().map(String::as_str).collect(),
            Self::Blocked { .. } => Vec::new(),
        }
    }
}

/// Computes plans from snapshots. Stateless apart from the registry handle.
pub struct Planner {
    registry: Arc<ActionRegistry>,
}

impl Planner {
    pub fn new(registry: Arc<ActionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn plan(&self, state: &WorldState, goal: &Goal, mode: PlanMode) -> Plan {
        if goal.satisfied(state) {
            debug!(goal = goal.name(), "Goal already satisfied");
            return Plan::Blocked {
                goal_satisfied: true,
            };
        }

        let eligible = self.registry.eligible(state);
        let plan = match mode {
            PlanMode::Single => eligible
                .first()
                .map(|a| Plan::Single(a.id().to_string()))
                .unwrap_or(Plan::Blocked {
                    goal_satisfied: false,
                }),

            PlanMode::Parallel => Self::batch_of(
                eligible
                    .iter()
                    .filter(|a| a.is_parallel_safe())
                    .map(|a| a.id().to_string())
                    .collect(),
            ),

            PlanMode::Hybrid => {
                match eligible.iter().find(|a| !a.is_parallel_safe()) {
                    // Serial work exists: drain it one action per cycle.
                    Some(serial) => Plan::Single(serial.id().to_string()),
                    None => Self::batch_of(
                        eligible.iter().map(|a| a.id().to_string()).collect(),
                    ),
                }
            }
        };

        debug!(?mode, ?plan, "Planned next unit of work");
        plan
    }

    fn batch_of(ids: Vec<String>) -> Plan {
        if ids.is_empty() {
            Plan::Blocked {
                goal_satisfied: false,
            }
        } else {
            Plan::Batch(ids)
        }
    }
}
