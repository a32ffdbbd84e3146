//! chat-gateway: relays chat prompts to a hosted text-generation model.
//!
//! `POST /api/chat` validates the prompt, makes one upstream inference call
//! and answers with `{ response: { message, model, timestamp } }` or an error
//! envelope. See [`startup::build_router`] for the full route table.

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

pub use startup::{build_router, AppState, Application};
