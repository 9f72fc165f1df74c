//! Action catalog types.
//!
//! An action is an immutable unit of work: a precondition gating its
//! eligibility, a declarative effect applied on success, a cost used for
//! deterministic tie-breaking, a parallel-safety tag, and an executor that
//! performs the actual generation work against the backend.

mod registry;

pub use registry::ActionRegistry;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::backend::{BackendClient, BackendError, GenerationPayload, GenerationRequest};
use crate::error::Result;
use crate::state::{Value, WorldSchema, WorldState};

/// A pure predicate over world state.
///
/// Preconditions and goals are built from the same combinators so they stay
/// inspectable and deterministic; no closures, no hidden state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Always true. Useful for unconditional bootstrap actions.
    Always,
    FlagSet(String),
    FlagClear(String),
    IntAtLeast(String, i64),
    IntEquals(String, i64),
    IntLessThan(String, i64),
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn eval(&self, state: &WorldState) -> bool {
        match self {
            Self::Always => true,
            Self::FlagSet(key) => state.flag(key),
            Self::FlagClear(key) => !state.flag(key),
            Self::IntAtLeast(key, n) => state.int(key) >= *n,
            Self::IntEquals(key, n) => state.int(key) == *n,
            Self::IntLessThan(key, n) => state.int(key) < *n,
            Self::All(preds) => preds.iter().all(|p| p.eval(state)),
            Self::Any(preds) => preds.iter().any(|p| p.eval(state)),
            Self::Not(pred) => !pred.eval(state),
        }
    }

    pub fn and(self, other: Predicate) -> Predicate {
        match self {
            Self::All(mut preds) => {
                preds.push(other);
                Self::All(preds)
            }
            first => Self::All(vec![first, other]),
        }
    }
}

/// One write in an effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOp {
    Set { key: String, value: Value },
    Add { key: String, delta: i64 },
}

impl WriteOp {
    pub fn key(&self) -> &str {
        match self {
            Self::Set { key, .. } => key,
            Self::Add { key, .. } => key,
        }
    }
}

/// A declarative world-state transform.
///
/// Effects are lists of writes rather than opaque closures so the registry
/// can check parallel actions for overlapping write sets at registration
/// time, and so a store can validate the whole transform before committing
/// any of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Effect {
    ops: Vec<WriteOp>,
}

impl Effect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(WriteOp::Set {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn add(mut self, key: impl Into<String>, delta: i64) -> Self {
        self.ops.push(WriteOp::Add {
            key: key.into(),
            delta,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The set of keys this effect writes.
    pub fn writes(&self) -> BTreeSet<&str> {
        self.ops.iter().map(WriteOp::key).collect()
    }

    /// Validate every write against a schema without applying anything.
    pub fn validate(&self, schema: &WorldSchema) -> Result<()> {
        for op in &self.ops {
            match op {
                WriteOp::Set { key, value } => schema.check(key, value)?,
                WriteOp::Add { key, .. } => schema.check_int(key)?,
            }
        }
        Ok(())
    }

    /// Pure application: returns the transformed snapshot, leaving the
    /// input untouched. Increments on a missing key start from zero.
    pub fn apply(&self, state: &WorldState) -> WorldState {
        let mut next = state.clone();
        for op in &self.ops {
            match op {
                WriteOp::Set { key, value } => next.insert(key.clone(), value.clone()),
                WriteOp::Add { key, delta } => {
                    let current = next.int(key);
                    next.insert(key.clone(), Value::Int(current + delta));
                }
            }
        }
        next
    }
}

/// Performs the generation work for one action attempt.
///
/// Implementations build a backend request from the current snapshot and
/// submit it; the engine executor owns retry, backoff, and fallback around
/// repeated attempts.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn attempt(
        &self,
        action_id: &str,
        state: &WorldState,
        backend: &dyn BackendClient,
    ) -> std::result::Result<GenerationPayload, BackendError>;
}

/// Default executor: renders a prompt template against the snapshot and
/// submits one generation request.
///
/// Template placeholders of the form `{key}` are substituted with the
/// current value of that world-state key.
pub struct PromptExecutor {
    template: String,
}

impl PromptExecutor {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn render(&self, state: &WorldState) -> String {
        let mut prompt = self.template.clone();
        for (key, value) in state.iter() {
            let placeholder = format!("{{{}}}", key);
            if prompt.contains(&placeholder) {
                prompt = prompt.replace(&placeholder, &value.to_string());
            }
        }
        prompt
    }
}

#[async_trait]
impl ActionExecutor for PromptExecutor {
    async fn attempt(
        &self,
        action_id: &str,
        state: &WorldState,
        backend: &dyn BackendClient,
    ) -> std::result::Result<GenerationPayload, BackendError> {
        let request = GenerationRequest::new(action_id, self.render(state));
        backend.generate(&request).await
    }
}

/// An immutable action definition.
#[derive(Clone)]
pub struct Action {
    id: String,
    precondition: Predicate,
    effect: Effect,
    cost: u32,
    parallel_safe: bool,
    executor: Arc<dyn ActionExecutor>,
}

impl Action {
    /// Create an action with a default prompt executor derived from its id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let executor = Arc::new(PromptExecutor::new(format!(
            "Perform the '{}' step for the current writing project.",
            id
        )));
        Self {
            id,
            precondition: Predicate::Always,
            effect: Effect::new(),
            cost: 0,
            parallel_safe: false,
            executor,
        }
    }

    pub fn with_precondition(mut self, precondition: Predicate) -> Self {
        self.precondition = precondition;
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effect = effect;
        self
    }

    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    pub fn parallel_safe(mut self, parallel_safe: bool) -> Self {
        self.parallel_safe = parallel_safe;
        self
    }

    pub fn with_prompt(mut self, template: impl Into<String>) -> Self {
        self.executor = Arc::new(PromptExecutor::new(template));
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn ActionExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn is_parallel_safe(&self) -> bool {
        self.parallel_safe
    }

    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    pub fn executor(&self) -> &dyn ActionExecutor {
        self.executor.as_ref()
    }

    /// Whether this action is eligible against the given snapshot.
    pub fn eligible(&self, state: &WorldState) -> bool {
        self.precondition.eval(state)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("id", &self.id)
            .field("cost", &self.cost)
            .field("parallel_safe", &self.parallel_safe)
            .field("effect", &self.effect)
            .finish_non_exhaustive()
    }
}
