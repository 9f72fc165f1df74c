//! Shared test doubles.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use draft_pilot::backend::{
    BackendClient, BackendError, GenerationPayload, GenerationRequest,
};

/// One scripted backend attempt outcome.
pub enum Attempt {
    Ok,
    Err(BackendError),
}

/// Backend double with per-action scripts.
///
/// Each `generate` call pops the next scripted outcome for the requesting
/// action; an exhausted or absent script succeeds. Actions marked
/// `always_fail` return the same error on every attempt.
#[derive(Default)]
pub struct ScriptedBackend {
    scripts: Mutex<HashMap<String, VecDeque<Attempt>>>,
    always_fail: Mutex<HashMap<String, BackendError>>,
    attempts: Mutex<HashMap<String, u32>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, action_id: &str, outcomes: Vec<Attempt>) {
        self.scripts
            .lock()
            .insert(action_id.to_string(), outcomes.into());
    }

    pub fn always_fail(&self, action_id: &str, error: BackendError) {
        self.always_fail
            .lock()
            .insert(action_id.to_string(), error);
    }

    /// Backend attempts observed for an action.
    pub fn attempts(&self, action_id: &str) -> u32 {
        self.attempts
            .lock()
            .get(action_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl BackendClient for ScriptedBackend {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationPayload, BackendError> {
        *self
            .attempts
            .lock()
            .entry(request.action_id.clone())
            .or_insert(0) += 1;

        if let Some(error) = self.always_fail.lock().get(&request.action_id) {
            return Err(error.clone());
        }

        let next = self
            .scripts
            .lock()
            .get_mut(&request.action_id)
            .and_then(VecDeque::pop_front);
        match next {
            Some(Attempt::Err(error)) => Err(error),
            Some(Attempt::Ok) | None => Ok(GenerationPayload::new(format!(
                "generated content for {}",
                request.action_id
            ))),
        }
    }
}
