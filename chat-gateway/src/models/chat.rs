use serde::{Deserialize, Serialize};
use serde_json::Value;
use service_core::error::AppError;
use validator::{Validate, ValidationError};

pub const MESSAGE_REQUIRED: &str = "Message is required and must be a string";
pub const IMAGE_URL_INVALID: &str = "image_url must be a string";

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct ChatRequest {
    #[validate(custom(function = "not_blank"))]
    pub message: String,
    /// Accepted and type-checked, never sent upstream.
    pub image_url: Option<String>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

impl ChatRequest {
    /// Build a request from an arbitrary JSON body.
    ///
    /// Field checks run in a fixed order so the caller always gets the
    /// message error first: `message` must be a non-blank string, then
    /// `image_url` must be a string or absent/null.
    pub fn from_json(body: &Value) -> Result<Self, AppError> {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::BadRequest(MESSAGE_REQUIRED.to_string()))?;

        let image_url = match body.get("image_url") {
            None | Some(Value::Null) => None,
            Some(Value::String(url)) => Some(url.clone()),
            Some(_) => return Err(AppError::BadRequest(IMAGE_URL_INVALID.to_string())),
        };

        let request = ChatRequest {
            message: message.to_string(),
            image_url,
        };
        request
            .validate()
            .map_err(|_| AppError::BadRequest(MESSAGE_REQUIRED.to_string()))?;

        Ok(request)
    }
}

/// Successful chat reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
    pub model: String,
    pub timestamp: String,
}

/// `{ "response": ChatResponse }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponseEnvelope {
    pub response: ChatResponse,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
}
