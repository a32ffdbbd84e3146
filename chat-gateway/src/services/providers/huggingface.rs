//! Hugging Face Inference API provider.
//!
//! Calls the hosted text-generation task: `POST {api_base}/{model}` with the
//! prompt as `inputs` and the fixed sampling parameters.

use super::{GenerationParams, GenerationResult, ProviderError, TextProvider};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest upstream error body echoed into an error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Hugging Face provider configuration.
#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    pub api_key: Secret<String>,
    pub api_base: String,
    pub timeout: Duration,
}

/// Hugging Face text provider. One instance (and one connection pool) is
/// shared by every request.
pub struct HuggingFaceTextProvider {
    config: HuggingFaceConfig,
    client: Client,
}

impl HuggingFaceTextProvider {
    pub fn new(config: HuggingFaceConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), model)
    }
}

#[async_trait]
impl TextProvider for HuggingFaceTextProvider {
    async fn generate(
        &self,
        model: &str,
        inputs: &str,
        params: &GenerationParams,
    ) -> Result<GenerationResult, ProviderError> {
        let request = InferenceRequest {
            inputs,
            parameters: params,
            options: InferenceOptions {
                wait_for_model: true,
                use_cache: false,
            },
        };

        tracing::debug!(
            model = %model,
            prompt_len = inputs.len(),
            "Sending request to Hugging Face inference API"
        );

        let response = self
            .client
            .post(self.model_url(model))
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let parsed: InferenceResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        match parsed {
            InferenceResponse::Error(err) => Err(ProviderError::Other(err.error)),
            InferenceResponse::Batch(generations) => Ok(GenerationResult {
                generated_text: generations.into_iter().next().and_then(|g| g.generated_text),
            }),
            InferenceResponse::Single(generation) => Ok(GenerationResult {
                generated_text: generation.generated_text,
            }),
        }
    }
}

/// Map a non-2xx upstream reply to a provider error.
fn status_error(status: StatusCode, body: &str) -> ProviderError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.chars().take(MAX_ERROR_BODY_CHARS).collect());

    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Unauthorized(message),
        StatusCode::SERVICE_UNAVAILABLE => ProviderError::ModelUnavailable(message),
        _ => ProviderError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

// ============================================================================
// Inference API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: &'a GenerationParams,
    options: InferenceOptions,
}

#[derive(Debug, Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
    use_cache: bool,
}

/// The API answers with a one-element array for text generation, some
/// deployments with a bare object, and `{"error": ...}` on model failures.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Error(ErrorBody),
    Batch(Vec<Generation>),
    Single(Generation),
}

#[derive(Debug, Deserialize)]
struct Generation {
    #[serde(default)]
    generated_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_status_codes() {
        assert_eq!(
            status_error(StatusCode::TOO_MANY_REQUESTS, ""),
            ProviderError::RateLimited
        );
        assert_eq!(
            status_error(StatusCode::UNAUTHORIZED, r#"{"error":"Invalid token"}"#),
            ProviderError::Unauthorized("Invalid token".to_string())
        );
        assert_eq!(
            status_error(
                StatusCode::SERVICE_UNAVAILABLE,
                r#"{"error":"Model is currently loading","estimated_time":20.0}"#
            ),
            ProviderError::ModelUnavailable("Model is currently loading".to_string())
        );
        assert_eq!(
            status_error(StatusCode::BAD_GATEWAY, "upstream exploded"),
            ProviderError::Api {
                status: 502,
                message: "upstream exploded".to_string()
            }
        );
    }

    #[test]
    fn truncates_long_error_bodies() {
        let body = "x".repeat(1000);
        match status_error(StatusCode::INTERNAL_SERVER_ERROR, &body) {
            ProviderError::Api { message, .. } => assert_eq!(message.len(), MAX_ERROR_BODY_CHARS),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn error_body_is_not_mistaken_for_generation() {
        let parsed: InferenceResponse =
            serde_json::from_str(r#"{"error":"Input validation error"}"#).unwrap();
        assert!(matches!(parsed, InferenceResponse::Error(_)));

        let parsed: InferenceResponse =
            serde_json::from_str(r#"[{"generated_text":"hi"}]"#).unwrap();
        assert!(matches!(parsed, InferenceResponse::Batch(_)));
    }

    #[test]
    fn request_body_shape() {
        let params = GenerationParams::default();
        let request = InferenceRequest {
            inputs: "Hello",
            parameters: &params,
            options: InferenceOptions {
                wait_for_model: true,
                use_cache: false,
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["inputs"], "Hello");
        assert_eq!(json["parameters"]["max_new_tokens"], 500);
        assert_eq!(json["parameters"]["return_full_text"], false);
        assert_eq!(json["parameters"]["top_k"], 50);
        assert_eq!(json["parameters"]["stop_sequences"][0], "</s>");
        assert_eq!(json["options"]["wait_for_model"], true);
    }
}
