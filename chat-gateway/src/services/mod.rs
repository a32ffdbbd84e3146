pub mod chat;
pub mod metrics;
pub mod providers;

pub use chat::{ChatError, ChatService};
