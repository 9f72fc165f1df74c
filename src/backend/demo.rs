use async_trait::async_trait;

use super::{BackendClient, BackendError, GenerationPayload, GenerationRequest};

/// Deterministic offline backend used by the CLI demo.
///
/// Produces canned prose for every request so the engine can be exercised
/// end-to-end without network access or credentials.
#[derive(Debug, Clone, Default)]
pub struct DemoBackend {
    model: String,
}

impl DemoBackend {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

#[async_trait]
impl BackendClient for DemoBackend {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationPayload, BackendError> {
        let mut payload = GenerationPayload::new(format!(
            "[{}] {}\n\n(Generated offline by the demo backend.)",
            request.action_id, request.prompt
        ));
        payload.model = Some(if self.model.is_empty() {
            "demo".to_string()
        } else {
            self.model.clone()
        });
        Ok(payload)
    }
}
