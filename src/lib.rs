//! Goal-directed planning and execution engine for autonomous,
//! multi-step content generation.
//!
//! Given a project world state and a goal predicate, the engine repeatedly
//! plans the next unit of work from a static action catalog, executes it
//! against a generation backend (with retry, backoff, and a deterministic
//! template fallback), applies effects to the world state, and loops until
//! the goal is met, no action is eligible, the iteration cap is hit, or
//! the caller cancels.

pub mod action;
pub mod autopilot;
pub mod backend;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod planner;
pub mod state;

pub use action::{Action, ActionRegistry, Effect, Predicate};
pub use autopilot::{Autopilot, AutopilotHandle, ExecutionLog, RunReport, TerminationReason};
pub use backend::{BackendClient, BackendError, GenerationPayload, GenerationRequest};
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use executor::{ActionRecord, ExecOutcome, Executor, RetryConfig};
pub use planner::{Goal, Plan, PlanMode, Planner};
pub use state::{EngineState, Value, WorldSchema, WorldState, WorldStore};
