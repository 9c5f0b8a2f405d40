use async_trait::async_trait;
use serde_json::Value;

use crate::ClassifierError;

/// A single-turn generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub text: String,
    /// Structured-output schema hint, honoured by backends that support it.
    pub response_schema: Option<Value>,
}

/// Text-generation endpoint behind the gateway.
///
/// Returns the generated text verbatim (possibly fenced, possibly not JSON).
/// Only transport and provider-reported failures are errors.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> Result<String, ClassifierError>;

    fn model_name(&self) -> &str;
}
