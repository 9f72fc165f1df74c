//! Default writing-project action catalog.
//!
//! A book-shaped pipeline: outline, characters, chapters, dialogue polish,
//! manuscript assembly. Chapter drafting is parallel-safe with per-chapter
//! completion flags, so the chapter writes stay disjoint and can share a
//! batch. The catalog is parameterized by chapter count rather than being
//! runtime-mutable.

use crate::action::{Action, Effect, Predicate};
use crate::error::Result;
use crate::planner::Goal;
use crate::state::WorldState;

fn chapter_key(n: u32) -> String {
    format!("chapter_{}_done", n)
}

/// Predicate: every chapter flag is set.
fn all_chapters_done(chapters_total: u32) -> Predicate {
    Predicate::All(
        (1..=chapters_total)
            .map(|n| Predicate::FlagSet(chapter_key(n)))
            .collect(),
    )
}

/// Initial world state for a fresh project.
pub fn initial_world(title: &str, chapters_total: u32) -> WorldState {
    let mut state = WorldState::new()
        .with("project_title", title)
        .with("has_outline", false)
        .with("has_characters", false)
        .with("dialogue_polished", false)
        .with("manuscript_ready", false)
        .with("chapters_total", chapters_total as i64)
        .with("chapters_completed", 0i64);
    for n in 1..=chapters_total {
        state = state.with(chapter_key(n), false);
    }
    state
}

/// The default catalog for a project with the given chapter count.
pub fn writing_actions(chapters_total: u32) -> Vec<Action> {
    let mut actions = vec![
        Action::new("create_outline")
            .with_precondition(Predicate::FlagClear("has_outline".into()))
            .with_effect(Effect::new().set("has_outline", true))
            .with_cost(1)
            .with_prompt(
                "Write a chapter-by-chapter outline for '{project_title}' \
                 with {chapters_total} chapters.",
            ),
        Action::new("develop_characters")
            .with_precondition(
                Predicate::FlagSet("has_outline".into())
                    .and(Predicate::FlagClear("has_characters".into())),
            )
            .with_effect(Effect::new().set("has_characters", true))
            .with_cost(2)
            .with_prompt(
                "Develop the principal characters of '{project_title}', \
                 consistent with its outline.",
            ),
        Action::new("polish_dialogue")
            .with_precondition(
                all_chapters_done(chapters_total)
                    .and(Predicate::FlagClear("dialogue_polished".into())),
            )
            .with_effect(Effect::new().set("dialogue_polished", true))
            .with_cost(4)
            .parallel_safe(true)
            .with_prompt("Polish the dialogue across all chapters of '{project_title}'."),
        Action::new("compile_manuscript")
            .with_precondition(
                Predicate::FlagSet("dialogue_polished".into())
                    .and(Predicate::FlagClear("manuscript_ready".into())),
            )
            .with_effect(
                Effect::new()
                    .set("manuscript_ready", true)
                    .set("chapters_completed", chapters_total as i64),
            )
            .with_cost(5)
            .with_prompt("Assemble the finished chapters of '{project_title}' into a manuscript."),
    ];

    for n in 1..=chapters_total {
        actions.push(
            Action::new(format!("write_chapter_{}", n))
                .with_precondition(
                    Predicate::FlagSet("has_outline".into())
                        .and(Predicate::FlagSet("has_characters".into()))
                        .and(Predicate::FlagClear(chapter_key(n))),
                )
                .with_effect(Effect::new().set(chapter_key(n), true))
                .with_cost(3)
                .parallel_safe(true)
                .with_prompt(format!(
                    "Write chapter {} of '{{project_title}}' following the outline.",
                    n
                )),
        );
    }

    actions
}

/// Validate the catalog against a fresh registry, mostly for callers that
/// extend it with project-specific actions.
pub fn validate(chapters_total: u32) -> Result<()> {
    crate::action::ActionRegistry::with_actions(writing_actions(chapters_total)).map(|_| ())
}

/// Goal: the manuscript is assembled.
pub fn manuscript_goal() -> Goal {
    Goal::new(
        "manuscript_ready",
        Predicate::FlagSet("manuscript_ready".into()),
    )
}

/// Goal: every chapter is drafted.
pub fn chapters_goal(chapters_total: u32) -> Goal {
    Goal::new("all_chapters_done", all_chapters_done(chapters_total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionRegistry;

    #[test]
    fn test_catalog_registers_cleanly() {
        let registry = ActionRegistry::with_actions(writing_actions(4)).unwrap();
        // outline, characters, polish, compile, four chapters
        assert_eq!(registry.len(), 8);
    }

    #[test]
    fn test_chapter_writes_are_disjoint() {
        let actions = writing_actions(3);
        let chapter_actions: Vec<_> = actions
            .iter()
            .filter(|a| a.id().starts_with("write_chapter_"))
            .collect();

        for (i, a) in chapter_actions.iter().enumerate() {
            for b in chapter_actions.iter().skip(i + 1) {
                assert!(a.effect().writes().is_disjoint(&b.effect().writes()));
            }
        }
    }

    #[test]
    fn test_pipeline_ordering_via_preconditions() {
        let state = initial_world("Test", 2);
        let registry = ActionRegistry::with_actions(writing_actions(2)).unwrap();

        let ids: Vec<&str> = registry.eligible(&state).iter().map(|a| a.id()).collect();
        assert_eq!(ids, vec!["create_outline"]);

        let with_outline = Effect::new().set("has_outline", true).apply(&state);
        let ids: Vec<&str> = registry
            .eligible(&with_outline)
            .iter()
            .map(|a| a.id())
            .collect();
        assert_eq!(ids, vec!["develop_characters"]);
    }

    #[test]
    fn test_goals() {
        let done = initial_world("Test", 1);
        assert!(!manuscript_goal().satisfied(&done));

        let done = Effect::new()
            .set("chapter_1_done", true)
            .set("manuscript_ready", true)
            .apply(&done);
        assert!(manuscript_goal().satisfied(&done));
        assert!(chapters_goal(1).satisfied(&done));
        assert!(!chapters_goal(2).satisfied(&done));
    }
}
