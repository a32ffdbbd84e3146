//! Inference provider abstraction.
//!
//! The chat pipeline talks to a hosted text-generation model through the
//! [`TextProvider`] trait so the upstream can be swapped for a stub in tests.

pub mod huggingface;
pub mod mock;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Error type for provider operations.
///
/// The display text is what callers see in the `details` field of a failed
/// chat response, so it stays short and free of credentials.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("rate limited")]
    RateLimited,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("upstream error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),

    /// Failure reported verbatim by the provider.
    #[error("{0}")]
    Other(String),
}

/// Sampling/decoding configuration sent with every inference call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub return_full_text: bool,
    pub do_sample: bool,
    pub top_p: f32,
    pub top_k: u32,
    pub repetition_penalty: f32,
    pub length_penalty: f32,
    pub stop_sequences: Vec<String>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 500,
            temperature: 0.7,
            return_full_text: false,
            do_sample: true,
            top_p: 0.95,
            top_k: 50,
            repetition_penalty: 1.1,
            length_penalty: 1.0,
            stop_sequences: vec!["</s>".to_string(), "[INST]".to_string()],
        }
    }
}

/// Upstream result. `generated_text` is `None` when the provider answered
/// without any text; callers decide whether that is an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationResult {
    pub generated_text: Option<String>,
}

/// Trait for text generation providers.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Run one completion of `inputs` on `model`.
    async fn generate(
        &self,
        model: &str,
        inputs: &str,
        params: &GenerationParams,
    ) -> Result<GenerationResult, ProviderError>;
}
