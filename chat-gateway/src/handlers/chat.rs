use crate::models::chat::MESSAGE_REQUIRED;
use crate::models::{ChatRequest, ChatResponseEnvelope};
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::Value;
use service_core::error::AppError;

/// `POST /api/chat`
///
/// Validates the body, makes exactly one upstream call and wraps the result
/// in the response envelope. Invalid input never reaches the provider.
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ChatResponseEnvelope>, AppError> {
    let Json(body) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected chat body");
        AppError::BadRequest(MESSAGE_REQUIRED.to_string())
    })?;

    let request = ChatRequest::from_json(&body).inspect_err(|e| {
        tracing::warn!(error = %e, "Invalid chat request");
    })?;

    tracing::info!(
        message_len = request.message.len(),
        has_image = request.image_url.is_some(),
        "Received chat request"
    );

    let response = state.chat.reply(&request).await.map_err(|e| {
        tracing::error!(
            error = %e,
            error_debug = ?e,
            model = %state.chat.model_id(),
            "Error processing chat request"
        );
        AppError::ProcessingError(e.to_string())
    })?;

    Ok(Json(ChatResponseEnvelope { response }))
}
