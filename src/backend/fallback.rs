use crate::state::WorldState;

use super::GenerationPayload;

/// Deterministic, backend-free generator of last resort.
///
/// Invoked when retries are exhausted or the backend failed fatally.
/// Pure and total: the same action and snapshot always render the same
/// payload, and rendering never fails, so every action is guaranteed to
/// produce some usable result.
#[derive(Debug, Clone, Default)]
pub struct TemplateFallback;

impl TemplateFallback {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, action_id: &str, state: &WorldState) -> GenerationPayload {
        let title = state.text("project_title").unwrap_or("the project");
        let mut content = format!(
            "[placeholder] Draft material for step '{}' of {}.\n",
            action_id, title
        );

        // Keyed facts give downstream editors something concrete to
        // revise, even without backend output.
        let facts: Vec<String> = state
            .iter()
            .map(|(key, value)| format!("{} = {}", key, value))
            .collect();
        if !facts.is_empty() {
            content.push_str("Known project facts: ");
            content.push_str(&facts.join(", "));
            content.push('.');
        }

        GenerationPayload::degraded(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_deterministic() {
        let state = WorldState::new()
            .with("project_title", "Northern Lights")
            .with("has_outline", true);
        let fallback = TemplateFallback::new();

        let a = fallback.render("write_chapter_1", &state);
        let b = fallback.render("write_chapter_1", &state);
        assert_eq!(a.content, b.content);
        assert!(a.degraded);
        assert!(a.content.contains("write_chapter_1"));
        assert!(a.content.contains("Northern Lights"));
    }

    #[test]
    fn test_fallback_total_on_empty_state() {
        let payload = TemplateFallback::new().render("create_outline", &WorldState::new());
        assert!(payload.degraded);
        assert!(!payload.content.is_empty());
    }
}
