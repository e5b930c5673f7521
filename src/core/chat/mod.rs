//! Conversation state: persisted summaries and histories, the controller that
//! talks to the chat endpoint, and transcript formatting.

pub mod controller;
pub mod store;
pub mod transcript;

pub use controller::{ChatController, ExportError, SendError};
pub use store::ChatSessionStore;
