//! Request/response shapes of the HTTP surface.

pub mod chat;

pub use chat::{ChatRequest, ChatResponse, ChatResponseEnvelope, HealthStatus};
