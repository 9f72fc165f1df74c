//! The autopilot control loop.
//!
//! Drives repeated plan -> execute cycles on a single control task until
//! the goal is reached, no eligible action remains, the iteration cap is
//! hit, or the caller cancels. Batch plans fan out one task per action and
//! join fully before the next cycle plans: cycle N+1 never reads a
//! snapshot while cycle N is still in flight.

mod log;

pub use log::{EntryOutcome, ExecutionLog, ExecutionLogEntry};

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::action::ActionRegistry;
use crate::error::{EngineError, Result};
use crate::executor::{ExecOutcome, Executor};
use crate::planner::{Goal, Plan, PlanMode, Planner};
use crate::state::{EngineState, WorldStore};

/// Why a run stopped. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Done,
    Blocked,
    IterationLimitReached,
    Cancelled,
}

impl TerminationReason {
    pub fn as_state(self) -> EngineState {
        match self {
            Self::Done => EngineState::Done,
            Self::Blocked => EngineState::Blocked,
            Self::IterationLimitReached => EngineState::IterationLimitReached,
            Self::Cancelled => EngineState::Cancelled,
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_state())
    }
}

/// Summary of one completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub reason: TerminationReason,
    /// Full plan -> execute cycles completed.
    pub cycles: u32,
    pub actions_executed: u32,
    /// How many of those actions degraded to the template fallback.
    pub fallback_count: u32,
}

/// The autopilot engine for one project session.
pub struct Autopilot {
    store: Arc<WorldStore>,
    planner: Planner,
    executor: Arc<Executor>,
    log: Arc<ExecutionLog>,
    registry: Arc<ActionRegistry>,
    state_tx: watch::Sender<EngineState>,
    cancel_tx: watch::Sender<bool>,
}

impl Autopilot {
    pub fn new(
        store: Arc<WorldStore>,
        registry: Arc<ActionRegistry>,
        executor: Arc<Executor>,
    ) -> Self {
        let (state_tx, _) = watch::channel(EngineState::Idle);
        let (cancel_tx, _) = watch::channel(false);
        Self {
            store,
            planner: Planner::new(Arc::clone(&registry)),
            executor,
            log: Arc::new(ExecutionLog::new()),
            registry,
            state_tx,
            cancel_tx,
        }
    }

    pub fn store(&self) -> &Arc<WorldStore> {
        &self.store
    }

    pub fn log(&self) -> &Arc<ExecutionLog> {
        &self.log
    }

    /// Current lifecycle state.
    pub fn status(&self) -> EngineState {
        *self.state_tx.borrow()
    }

    /// Subscribe to lifecycle state changes.
    pub fn watch_state(&self) -> watch::Receiver<EngineState> {
        self.state_tx.subscribe()
    }

    /// Request cooperative cancellation. Checked between cycles; an
    /// in-flight batch drains before the loop observes the request, so no
    /// action is ever left half-applied.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    fn transition(&self, to: EngineState) -> Result<()> {
        let from = *self.state_tx.borrow();
        if from == to {
            return Ok(());
        }
        if !from.can_transition_to(to) {
            return Err(EngineError::InvalidTransition { from, to });
        }
        debug!(%from, %to, "Engine state transition");
        self.state_tx.send_replace(to);
        Ok(())
    }

    /// Run plan -> execute cycles until termination.
    pub async fn run(&self, goal: &Goal, mode: PlanMode, max_iterations: u32) -> Result<RunReport> {
        let mut cycles = 0u32;
        let mut actions_executed = 0u32;
        let mut fallback_count = 0u32;

        // An iteration cap of zero terminates before any planning.
        if max_iterations == 0 {
            self.transition(EngineState::IterationLimitReached)?;
            return Ok(RunReport {
                reason: TerminationReason::IterationLimitReached,
                cycles,
                actions_executed,
                fallback_count,
            });
        }

        // A goal that is already satisfied produces no work and no log
        // entries at all.
        if goal.satisfied(&self.store.snapshot()) {
            info!(goal = goal.name(), "Goal satisfied before start");
            self.transition(EngineState::Done)?;
            return Ok(RunReport {
                reason: TerminationReason::Done,
                cycles,
                actions_executed,
                fallback_count,
            });
        }

        info!(goal = goal.name(), %mode, max_iterations, "Autopilot starting");

        let reason = loop {
            if self.is_cancelled() {
                warn!("Cancellation requested, stopping at cycle boundary");
                break TerminationReason::Cancelled;
            }

            self.transition(EngineState::Planning)?;
            let snapshot = self.store.snapshot();
            let plan = self.planner.plan(&snapshot, goal, mode);

            match &plan {
                Plan::Blocked { goal_satisfied } => {
                    let outcome = if *goal_satisfied {
                        EntryOutcome::GoalSatisfied
                    } else {
                        EntryOutcome::Blocked
                    };
                    self.log
                        .append(ExecutionLogEntry::plan_only(cycles + 1, outcome, snapshot));
                    break if *goal_satisfied {
                        TerminationReason::Done
                    } else {
                        TerminationReason::Blocked
                    };
                }

                _ if cycles >= max_iterations => {
                    break TerminationReason::IterationLimitReached;
                }

                Plan::Single(id) => {
                    self.transition(EngineState::Executing)?;
                    let outcome = self.execute_one(id, cycles + 1).await?;
                    actions_executed += 1;
                    if outcome == ExecOutcome::Fallback {
                        fallback_count += 1;
                    }
                }

                Plan::Batch(ids) => {
                    self.transition(EngineState::Executing)?;
                    let outcomes = self.execute_batch(ids, cycles + 1).await?;
                    actions_executed += outcomes.len() as u32;
                    fallback_count += outcomes
                        .iter()
                        .filter(|o| **o == ExecOutcome::Fallback)
                        .count() as u32;
                }
            }

            cycles += 1;
        };

        info!(%reason, cycles, actions_executed, fallback_count, "Autopilot finished");
        self.transition(reason.as_state())?;
        Ok(RunReport {
            reason,
            cycles,
            actions_executed,
            fallback_count,
        })
    }

    async fn execute_one(&self, id: &str, cycle: u32) -> Result<ExecOutcome> {
        let action = self
            .registry
            .get(id)
            .ok_or_else(|| EngineError::ActionNotFound(id.to_string()))?;
        let record = self.executor.execute(action, &self.store).await?;
        let outcome = record.outcome;
        self.log.append(ExecutionLogEntry::from_record(cycle, &record));
        Ok(outcome)
    }

    /// Fan out one task per batch member and join them all. A member's
    /// fallback never aborts its siblings; each task appends its own log
    /// entry on completion, so entries reflect actual completion order.
    async fn execute_batch(&self, ids: &[String], cycle: u32) -> Result<Vec<ExecOutcome>> {
        let mut handles: Vec<JoinHandle<Result<ExecOutcome>>> = Vec::with_capacity(ids.len());

        for id in ids {
            let action = self
                .registry
                .get(id)
                .ok_or_else(|| EngineError::ActionNotFound(id.to_string()))?
                .clone();
            let executor = Arc::clone(&self.executor);
            let store = Arc::clone(&self.store);
            let log = Arc::clone(&self.log);

            handles.push(tokio::spawn(async move {
                let record = executor.execute(&action, &store).await?;
                let outcome = record.outcome;
                log.append(ExecutionLogEntry::from_record(cycle, &record));
                Ok(outcome)
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for joined in join_all(handles).await {
            outcomes.push(joined??);
        }
        Ok(outcomes)
    }
}

/// Handle to a running autopilot, the caller-facing control surface.
pub struct AutopilotHandle {
    engine: Arc<Autopilot>,
    join: JoinHandle<Result<RunReport>>,
}

impl AutopilotHandle {
    /// Spawn the loop on the runtime and return a handle to it.
    pub fn start(
        engine: Arc<Autopilot>,
        goal: Goal,
        mode: PlanMode,
        max_iterations: u32,
    ) -> Self {
        let runner = Arc::clone(&engine);
        let join =
            tokio::spawn(async move { runner.run(&goal, mode, max_iterations).await });
        Self { engine, join }
    }

    pub fn status(&self) -> EngineState {
        self.engine.status()
    }

    pub fn cancel(&self) {
        self.engine.cancel();
    }

    pub fn engine(&self) -> &Arc<Autopilot> {
        &self.engine
    }

    /// Wait for the run to finish and return its report.
    pub async fn join(self) -> Result<RunReport> {
        self.join.await?
    }
}
