//! synth-llm: Remote explanation service for selected medical terms.
//! Wraps an OpenAI-compatible chat completions endpoint behind
//! [`ExplanationProvider`].

pub mod backend;
pub mod explain;

pub use backend::{LlmBackend, LlmError, LlmRequest, LlmResponse, Message, OpenAiCompatibleBackend};
pub use explain::{
    failure_message, truncate_to_last_sentence, ExplanationProvider, MedicalExplainer,
    EXPLANATION_ERROR_PREFIX,
};
