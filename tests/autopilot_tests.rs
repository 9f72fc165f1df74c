mod common;

use std::sync::Arc;

use common::ScriptedBackend;
use draft_pilot::action::{Action, ActionRegistry, Effect, Predicate};
use draft_pilot::autopilot::{Autopilot, AutopilotHandle, EntryOutcome, TerminationReason};
use draft_pilot::backend::{BackendClient, BackendError, RetryReason};
use draft_pilot::catalog;
use draft_pilot::executor::Executor;
use draft_pilot::planner::{Goal, PlanMode};
use draft_pilot::state::{EngineState, WorldState, WorldStore};

fn engine(
    initial: WorldState,
    actions: Vec<Action>,
    backend: Arc<ScriptedBackend>,
) -> Autopilot {
    let store = Arc::new(WorldStore::new(initial));
    let registry = Arc::new(ActionRegistry::with_actions(actions).unwrap());
    let executor = Arc::new(Executor::new(backend as Arc<dyn BackendClient>));
    Autopilot::new(store, registry, executor)
}

fn outline_action() -> Action {
    Action::new("create_outline")
        .with_precondition(Predicate::FlagClear("has_outline".into()))
        .with_effect(Effect::new().set("has_outline", true))
        .with_cost(1)
}

fn chapter_action(n: u32) -> Action {
    let key = format!("chapter_{}_done", n);
    Action::new(format!("write_chapter_{}", n))
        .with_precondition(Predicate::FlagClear(key.clone()))
        .with_effect(Effect::new().set(key, true))
        .with_cost(3)
        .parallel_safe(true)
}

// One outline action, goal `has_outline`, single mode.
#[tokio::test]
async fn single_mode_reaches_done_in_one_cycle() {
    let engine = engine(
        WorldState::new().with("has_outline", false),
        vec![outline_action()],
        Arc::new(ScriptedBackend::new()),
    );
    let goal = Goal::new("outlined", Predicate::FlagSet("has_outline".into()));

    let report = engine.run(&goal, PlanMode::Single, 5).await.unwrap();

    assert_eq!(report.reason, TerminationReason::Done);
    assert_eq!(report.cycles, 1);
    assert_eq!(report.actions_executed, 1);
    assert_eq!(engine.status(), EngineState::Done);
    assert!(engine.store().snapshot().flag("has_outline"));

    // One action entry plus the synthetic goal-satisfied entry.
    let entries = engine.log().entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].action_id.as_deref(), Some("create_outline"));
    assert_eq!(entries[1].outcome, EntryOutcome::GoalSatisfied);
    assert!(entries[1].action_id.is_none());
}

// Three parallel-safe chapter actions run concurrently in
// one cycle, then the engine blocks because no goal was declared over them.
#[tokio::test]
async fn parallel_mode_batches_all_eligible_then_blocks() {
    let initial = WorldState::new()
        .with("chapter_1_done", false)
        .with("chapter_2_done", false)
        .with("chapter_3_done", false);
    let engine = engine(
        initial,
        vec![chapter_action(1), chapter_action(2), chapter_action(3)],
        Arc::new(ScriptedBackend::new()),
    );
    let goal = Goal::new("unreachable", Predicate::FlagSet("published".into()));

    let report = engine.run(&goal, PlanMode::Parallel, 5).await.unwrap();

    assert_eq!(report.reason, TerminationReason::Blocked);
    assert_eq!(report.cycles, 1);
    assert_eq!(report.actions_executed, 3);

    let snapshot = engine.store().snapshot();
    assert!(snapshot.flag("chapter_1_done"));
    assert!(snapshot.flag("chapter_2_done"));
    assert!(snapshot.flag("chapter_3_done"));

    let entries = engine.log().entries();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[3].outcome, EntryOutcome::Blocked);
}

// A batch member that degrades to fallback does not abort its siblings.
#[tokio::test]
async fn batch_member_failure_is_isolated() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.always_fail(
        "write_chapter_2",
        BackendError::Retryable(RetryReason::ServerError("503".into())),
    );
    let initial = WorldState::new()
        .with("chapter_1_done", false)
        .with("chapter_2_done", false);
    let engine = engine(
        initial,
        vec![chapter_action(1), chapter_action(2)],
        backend,
    );
    let goal = Goal::new(
        "both",
        Predicate::All(vec![
            Predicate::FlagSet("chapter_1_done".into()),
            Predicate::FlagSet("chapter_2_done".into()),
        ]),
    );

    let report = engine.run(&goal, PlanMode::Parallel, 5).await.unwrap();

    assert_eq!(report.reason, TerminationReason::Done);
    assert_eq!(report.actions_executed, 2);
    assert_eq!(report.fallback_count, 1);
    assert!(engine.store().snapshot().flag("chapter_2_done"));
}

// A precondition that can never become true blocks the run
// on the first cycle with zero actions executed.
#[tokio::test]
async fn unreachable_precondition_blocks_immediately() {
    let build_world = Action::new("build_world")
        .with_precondition(Predicate::FlagSet("has_characters".into()))
        .with_effect(Effect::new().set("world_built", true));
    let initial = WorldState::new()
        .with("has_characters", false)
        .with("world_built", false);
    let engine = engine(initial, vec![build_world], Arc::new(ScriptedBackend::new()));
    let goal = Goal::new("built", Predicate::FlagSet("world_built".into()));

    let report = engine.run(&goal, PlanMode::Single, 10).await.unwrap();

    assert_eq!(report.reason, TerminationReason::Blocked);
    assert_eq!(report.cycles, 0);
    assert_eq!(report.actions_executed, 0);
    assert_eq!(engine.log().len(), 1);
}

// An iteration cap of zero terminates before planning.
#[tokio::test]
async fn zero_iteration_cap_short_circuits() {
    let engine = engine(
        WorldState::new().with("has_outline", false),
        vec![outline_action()],
        Arc::new(ScriptedBackend::new()),
    );
    let goal = Goal::new("outlined", Predicate::FlagSet("has_outline".into()));

    let report = engine.run(&goal, PlanMode::Single, 0).await.unwrap();

    assert_eq!(report.reason, TerminationReason::IterationLimitReached);
    assert_eq!(report.cycles, 0);
    assert_eq!(report.actions_executed, 0);
    assert!(engine.log().is_empty());
}

// Idempotent goal check: a goal satisfied before the loop starts yields
// Done with zero actions and zero log entries.
#[tokio::test]
async fn pre_satisfied_goal_returns_done_without_logging() {
    let engine = engine(
        WorldState::new().with("has_outline", true),
        vec![outline_action()],
        Arc::new(ScriptedBackend::new()),
    );
    let goal = Goal::new("outlined", Predicate::FlagSet("has_outline".into()));

    let report = engine.run(&goal, PlanMode::Single, 5).await.unwrap();

    assert_eq!(report.reason, TerminationReason::Done);
    assert_eq!(report.actions_executed, 0);
    assert!(engine.log().is_empty());
    assert_eq!(engine.status(), EngineState::Done);
}

// Termination bound: with a perpetually-eligible action, exactly
// max_iterations cycles run before the limit fires.
#[tokio::test]
async fn iteration_limit_bounds_cycle_count() {
    let busywork = Action::new("revise_notes")
        .with_effect(Effect::new().add("revisions", 1));
    let engine = engine(
        WorldState::new().with("revisions", 0i64),
        vec![busywork],
        Arc::new(ScriptedBackend::new()),
    );
    let goal = Goal::new("enough", Predicate::IntAtLeast("revisions".into(), 1_000));

    let report = engine.run(&goal, PlanMode::Single, 4).await.unwrap();

    assert_eq!(report.reason, TerminationReason::IterationLimitReached);
    assert_eq!(report.cycles, 4);
    assert_eq!(report.actions_executed, 4);
    assert_eq!(engine.store().snapshot().int("revisions"), 4);
}

// Hybrid mode over the full writing catalog: serial actions drain first,
// chapters batch, and the run ends with a manuscript.
#[tokio::test]
async fn hybrid_mode_completes_the_writing_catalog() {
    let chapters = 3;
    let engine = engine(
        catalog::initial_world("Northern Lights", chapters),
        catalog::writing_actions(chapters),
        Arc::new(ScriptedBackend::new()),
    );

    let report = engine
        .run(&catalog::manuscript_goal(), PlanMode::Hybrid, 10)
        .await
        .unwrap();

    assert_eq!(report.reason, TerminationReason::Done);
    // outline, characters, chapter batch, polish, compile
    assert_eq!(report.cycles, 5);
    assert_eq!(report.actions_executed, 7);

    let snapshot = engine.store().snapshot();
    assert!(snapshot.flag("manuscript_ready"));
    assert_eq!(snapshot.int("chapters_completed"), chapters as i64);
}

#[tokio::test]
async fn cancellation_is_observed_at_cycle_boundary() {
    let engine = Arc::new(engine(
        WorldState::new().with("has_outline", false),
        vec![outline_action()],
        Arc::new(ScriptedBackend::new()),
    ));
    let goal = Goal::new("outlined", Predicate::FlagSet("has_outline".into()));

    engine.cancel();
    let report = engine.run(&goal, PlanMode::Single, 5).await.unwrap();

    assert_eq!(report.reason, TerminationReason::Cancelled);
    assert_eq!(report.actions_executed, 0);
    assert_eq!(engine.status(), EngineState::Cancelled);
}

#[tokio::test]
async fn handle_exposes_status_and_report() {
    let engine = Arc::new(engine(
        WorldState::new().with("has_outline", false),
        vec![outline_action()],
        Arc::new(ScriptedBackend::new()),
    ));
    let goal = Goal::new("outlined", Predicate::FlagSet("has_outline".into()));

    let handle = AutopilotHandle::start(Arc::clone(&engine), goal, PlanMode::Single, 5);
    let report = handle.join().await.unwrap();

    assert_eq!(report.reason, TerminationReason::Done);
    assert_eq!(engine.status(), EngineState::Done);
}

#[tokio::test]
async fn store_observers_see_final_state() {
    let engine = engine(
        WorldState::new().with("has_outline", false),
        vec![outline_action()],
        Arc::new(ScriptedBackend::new()),
    );
    let rx = engine.store().subscribe();
    let goal = Goal::new("outlined", Predicate::FlagSet("has_outline".into()));

    engine.run(&goal, PlanMode::Single, 5).await.unwrap();

    assert!(rx.borrow().flag("has_outline"));
}
