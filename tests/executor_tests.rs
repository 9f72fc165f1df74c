mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Attempt, ScriptedBackend};
use draft_pilot::action::{Action, Effect, Predicate};
use draft_pilot::backend::{BackendClient, BackendError, FatalReason, RetryReason};
use draft_pilot::executor::{ExecOutcome, Executor};
use draft_pilot::state::{WorldState, WorldStore};

fn polish_action() -> Action {
    Action::new("polish_dialogue")
        .with_precondition(Predicate::FlagClear("dialogue_polished".into()))
        .with_effect(Effect::new().set("dialogue_polished", true))
        .with_cost(4)
        .parallel_safe(true)
}

fn store() -> WorldStore {
    WorldStore::new(
        WorldState::new()
            .with("dialogue_polished", false)
            .with("project_title", "Northern Lights"),
    )
}

#[tokio::test]
async fn first_attempt_success_applies_effect() {
    let backend = Arc::new(ScriptedBackend::new());
    let executor = Executor::new(Arc::clone(&backend) as Arc<dyn BackendClient>);
    let store = store();

    let record = executor.execute(&polish_action(), &store).await.unwrap();

    assert_eq!(record.outcome, ExecOutcome::Backend);
    assert_eq!(record.retries_attempted, 0);
    assert!(!record.payload.degraded);
    assert!(store.snapshot().flag("dialogue_polished"));
    assert_eq!(backend.attempts("polish_dialogue"), 1);
}

#[tokio::test]
async fn transient_failures_are_retried_then_succeed() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.script(
        "polish_dialogue",
        vec![
            Attempt::Err(BackendError::rate_limited()),
            Attempt::Err(BackendError::timeout(Duration::from_secs(30))),
            Attempt::Ok,
        ],
    );
    let executor = Executor::new(Arc::clone(&backend) as Arc<dyn BackendClient>);
    let store = store();

    let record = executor.execute(&polish_action(), &store).await.unwrap();

    assert_eq!(record.outcome, ExecOutcome::Backend);
    assert_eq!(record.retries_attempted, 2);
    assert_eq!(backend.attempts("polish_dialogue"), 3);
    assert!(store.snapshot().flag("dialogue_polished"));
}

// Always-retryable backend: three attempts with 100/200/400ms backoff,
// then the template fallback, whose effect is still applied.
#[tokio::test(start_paused = true)]
async fn exhausted_retries_fall_back_with_full_backoff() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.always_fail(
        "polish_dialogue",
        BackendError::Retryable(RetryReason::ServerError("503".into())),
    );
    let executor = Executor::new(Arc::clone(&backend) as Arc<dyn BackendClient>);
    let store = store();

    let started = tokio::time::Instant::now();
    let record = executor.execute(&polish_action(), &store).await.unwrap();

    assert_eq!(record.outcome, ExecOutcome::Fallback);
    assert_eq!(record.retries_attempted, 3);
    assert_eq!(backend.attempts("polish_dialogue"), 3);
    assert!(record.payload.degraded);
    assert!(store.snapshot().flag("dialogue_polished"));
    assert_eq!(started.elapsed(), Duration::from_millis(700));
}

#[tokio::test]
async fn fatal_failure_skips_retries() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.always_fail(
        "polish_dialogue",
        BackendError::Fatal(FatalReason::Auth("401".into())),
    );
    let executor = Executor::new(Arc::clone(&backend) as Arc<dyn BackendClient>);
    let store = store();

    let record = executor.execute(&polish_action(), &store).await.unwrap();

    assert_eq!(record.outcome, ExecOutcome::Fallback);
    assert_eq!(backend.attempts("polish_dialogue"), 1);
    assert!(store.snapshot().flag("dialogue_polished"));
}

#[tokio::test(start_paused = true)]
async fn rate_limit_hint_overrides_computed_backoff() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.script(
        "polish_dialogue",
        vec![
            Attempt::Err(BackendError::Retryable(RetryReason::RateLimited {
                retry_after: Some(Duration::from_secs(2)),
            })),
            Attempt::Ok,
        ],
    );
    let executor = Executor::new(Arc::clone(&backend) as Arc<dyn BackendClient>);
    let store = store();

    let started = tokio::time::Instant::now();
    let record = executor.execute(&polish_action(), &store).await.unwrap();

    assert_eq!(record.retries_attempted, 1);
    assert_eq!(started.elapsed(), Duration::from_secs(2));
}

#[tokio::test]
async fn invalid_effect_leaves_store_unchanged() {
    let backend = Arc::new(ScriptedBackend::new());
    let executor = Executor::new(backend as Arc<dyn BackendClient>);
    let store = store();
    let before = store.snapshot();

    // Effect writes a key the schema has never seen: a bug in the action
    // definition, surfaced as a validation error.
    let broken = Action::new("broken")
        .with_effect(Effect::new().set("dialogue_polished", true).set("nope", true));
    let err = executor.execute(&broken, &store).await.unwrap_err();

    assert!(err.to_string().contains("nope"));
    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn record_snapshots_bracket_the_effect() {
    let backend = Arc::new(ScriptedBackend::new());
    let executor = Executor::new(backend as Arc<dyn BackendClient>);
    let store = store();

    let record = executor.execute(&polish_action(), &store).await.unwrap();

    assert!(!record.state_before.flag("dialogue_polished"));
    assert!(record.state_after.flag("dialogue_polished"));
    assert_eq!(record.state_after, store.snapshot());
}
