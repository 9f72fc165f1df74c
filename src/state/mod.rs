//! World state and engine lifecycle state.
//!
//! Provides the project fact store the planner reasons over:
//! - `Value`, `ValueKind`: typed facts (bool / int / text)
//! - `WorldState`: immutable snapshot of all facts
//! - `WorldSchema`: declared key -> kind map used to validate writes
//! - `WorldStore`: the live store with serialized mutation and observers
//! - `EngineState`: autopilot lifecycle state machine

mod machine;
mod store;
mod value;
mod world;

pub use machine::EngineState;
pub use store::WorldStore;
pub use value::{Value, ValueKind};
pub use world::{WorldSchema, WorldState};
