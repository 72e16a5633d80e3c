//! Plain-language explanations of medical terms.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::backend::{LlmBackend, LlmError, LlmRequest, Message};

/// Prefix of every user-facing explanation failure.
pub const EXPLANATION_ERROR_PREFIX: &str = "❌ Error from explanation API: ";

const SYSTEM_PROMPT: &str = "You are a helpful medical assistant.";
const DEFAULT_MAX_TOKENS: u32 = 600;

/// Anything that can explain a single term.
#[async_trait]
pub trait ExplanationProvider: Send + Sync {
    async fn explain(&self, term: &str) -> Result<String, LlmError>;
}

/// Asks a chat model for a short explanation and trims the reply to whole sentences.
pub struct MedicalExplainer<B> {
    backend: B,
    max_tokens: u32,
}

impl<B: LlmBackend> MedicalExplainer<B> {
    pub fn new(backend: B) -> Self {
        Self { backend, max_tokens: DEFAULT_MAX_TOKENS }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn request_for(&self, term: &str) -> LlmRequest {
        LlmRequest {
            messages: vec![
                Message::system(SYSTEM_PROMPT),
                Message::user(format!("Explain the medical term: {} in clear and concise.", term)),
            ],
            model: None,
            max_tokens: Some(self.max_tokens),
            temperature: None,
        }
    }
}

#[async_trait]
impl<B: LlmBackend> ExplanationProvider for MedicalExplainer<B> {
    async fn explain(&self, term: &str) -> Result<String, LlmError> {
        debug!("Explaining '{}' with {}", term, self.backend.model_id());
        let resp = self.backend.complete(self.request_for(term)).await?;
        debug!(
            "Explanation tokens: prompt={} completion={}",
            resp.prompt_tokens, resp.completion_tokens
        );
        Ok(truncate_to_last_sentence(&resp.content).to_string())
    }
}

/// Cut `text` just after its last `.`; text without a period is returned as is.
pub fn truncate_to_last_sentence(text: &str) -> &str {
    match text.rfind('.') {
        Some(idx) => &text[..=idx],
        None => text,
    }
}

/// User-facing message for a failed explanation request.
pub fn failure_message(err: &LlmError) -> String {
    warn!("Explanation failed: {}", err);
    match err {
        LlmError::Timeout(after) => format!(
            "{}request timed out after {}s",
            EXPLANATION_ERROR_PREFIX,
            after.as_secs()
        ),
        LlmError::ApiError { message, .. } => format!("{}{}", EXPLANATION_ERROR_PREFIX, message),
        other => format!("{}{}", EXPLANATION_ERROR_PREFIX, other),
    }
}
