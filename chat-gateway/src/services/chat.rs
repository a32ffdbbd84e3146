//! The chat pipeline: one validated prompt in, one normalized reply out.

use crate::models::{ChatRequest, ChatResponse};
use crate::services::metrics;
use crate::services::providers::{GenerationParams, ProviderError, TextProvider};
use service_core::utils::timestamp;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

pub const EMPTY_GENERATION: &str = "No response generated from the model";

#[derive(Debug, Error)]
pub enum ChatError {
    /// Upstream succeeded but produced no usable text.
    #[error("No response generated from the model")]
    EmptyResult,

    #[error(transparent)]
    Upstream(#[from] ProviderError),
}

/// Forwards prompts to the configured model with fixed generation parameters.
///
/// Holds only immutable state, so one instance serves all requests
/// concurrently.
#[derive(Clone)]
pub struct ChatService {
    provider: Arc<dyn TextProvider>,
    model_id: String,
    params: GenerationParams,
}

impl ChatService {
    pub fn new(provider: Arc<dyn TextProvider>, model_id: impl Into<String>) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
            params: GenerationParams::default(),
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// Run a single upstream call for `request`. No retries.
    pub async fn reply(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        if request.image_url.is_some() {
            tracing::debug!("image_url supplied; text-only model, ignoring it");
        }

        let started = Instant::now();
        let result = self
            .provider
            .generate(&self.model_id, &request.message, &self.params)
            .await;
        let elapsed = started.elapsed();

        let outcome = match &result {
            Ok(r) if has_text(r.generated_text.as_deref()) => "success",
            Ok(_) => "empty",
            Err(_) => "error",
        };
        metrics::record_upstream_call(outcome, elapsed);

        let generated_text = result?
            .generated_text
            .filter(|text| !text.is_empty())
            .ok_or(ChatError::EmptyResult)?;

        tracing::debug!(
            model = %self.model_id,
            response_len = generated_text.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Received response from model"
        );

        Ok(ChatResponse {
            message: generated_text,
            model: self.model_id.clone(),
            timestamp: timestamp(),
        })
    }
}

fn has_text(text: Option<&str>) -> bool {
    text.is_some_and(|t| !t.is_empty())
}
