//! Agent module for LocalChat
//!
//! This module contains the conversation state, the streaming answer path,
//! the tool-using agent loop and the [`ChatService`] that ties them together.

pub mod chat;
pub mod conversation;
pub mod history;
pub mod metrics;
pub mod responder;
pub mod tool_agent;

pub use chat::ChatService;
pub use conversation::{Conversation, ConversationHandle, ConversationRegistry};
pub use responder::StreamResponder;
pub use tool_agent::ToolAgent;
