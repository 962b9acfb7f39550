//! Deterministic offline provider.

use async_trait::async_trait;

use crate::error::LlmError;
use crate::provider::{GenerationRequest, TextGenerator};

pub const STUB_PREFIX: &str = "[stub] preview: ";
const PREVIEW_CHARS: usize = 200;

/// The placeholder reply produced in stub mode for `prompt`.
pub fn stub_reply(prompt: &str) -> String {
    let preview: String = prompt.chars().take(PREVIEW_CHARS).collect();
    format!("{STUB_PREFIX}{preview}")
}

/// Provider that never touches the network and answers with [`stub_reply`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StubGenerator;

#[async_trait]
impl TextGenerator for StubGenerator {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<serde_json::Value, LlmError> {
        Ok(serde_json::json!({ "content": stub_reply(&request.prompt) }))
    }
}
