//! HTTP handlers for the chat gateway.

pub mod chat;
pub mod health;

pub use chat::chat;
pub use health::{health_check, metrics_endpoint, not_found};
