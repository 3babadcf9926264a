//! UI event model
//!
//! Everything the chat service tells a front end goes through an
//! [`EventSink`]. A stream of [`ChatEvent::StreamChunk`] batches for a
//! request is always terminated by exactly one [`ChatEvent::StreamEnd`].

use serde::Serialize;
use tokio::sync::mpsc;

/// Event name used for streamed text and the end-of-stream sentinel
pub const EVENT_CHAT_STREAM: &str = "chat-stream";
/// Event name used for tool results surfaced during the agent loop
pub const EVENT_TOOL_RESULT: &str = "tool-result";
/// Event name used when a session receives its derived name
pub const EVENT_SESSION_NAME_UPDATED: &str = "sessionNameUpdated";
/// Event name used for per-response token statistics
pub const EVENT_TOKEN_STATS: &str = "token-stats";
/// Event name used for errors raised before a stream could start
pub const EVENT_CHAT_ERROR: &str = "chat-error";

/// A notification delivered to the UI
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A batch of streamed assistant text
    StreamChunk {
        /// Session the text belongs to
        session_id: i64,
        /// Concatenation of one or more deltas
        text: String,
    },
    /// End-of-stream sentinel
    StreamEnd {
        /// Session whose stream finished
        session_id: i64,
    },
    /// Output of a tool call made by the agent loop
    ToolResult {
        /// Session the call was made for
        session_id: i64,
        /// Name of the tool, when the call could be parsed
        tool_name: Option<String>,
        /// Text injected back into the conversation
        content: String,
    },
    /// A session was renamed from its first message
    SessionNameUpdated {
        /// Renamed session
        session_id: i64,
        /// Derived name
        new_name: String,
    },
    /// Token throughput of a finished response
    TokenStats {
        /// Session the response belongs to
        session_id: i64,
        /// Approximate tokens in the response
        tokens: usize,
        /// Approximate tokens per second over the stream duration
        tokens_per_second: f64,
        /// Running total for the session
        session_total: usize,
    },
    /// A request failed before any text could be streamed
    Error {
        /// Session the request was made for
        session_id: i64,
        /// Human-readable failure
        message: String,
    },
}

impl ChatEvent {
    /// The event name a UI adapter should publish this event under
    pub fn event_name(&self) -> &'static str {
        match self {
            ChatEvent::StreamChunk { .. } | ChatEvent::StreamEnd { .. } => EVENT_CHAT_STREAM,
            ChatEvent::ToolResult { .. } => EVENT_TOOL_RESULT,
            ChatEvent::SessionNameUpdated { .. } => EVENT_SESSION_NAME_UPDATED,
            ChatEvent::TokenStats { .. } => EVENT_TOKEN_STATS,
            ChatEvent::Error { .. } => EVENT_CHAT_ERROR,
        }
    }

    /// Session the event belongs to
    pub fn session_id(&self) -> i64 {
        match self {
            ChatEvent::StreamChunk { session_id, .. }
            | ChatEvent::StreamEnd { session_id }
            | ChatEvent::ToolResult { session_id, .. }
            | ChatEvent::SessionNameUpdated { session_id, .. }
            | ChatEvent::TokenStats { session_id, .. }
            | ChatEvent::Error { session_id, .. } => *session_id,
        }
    }
}

/// Destination for UI events
///
/// `emit` is synchronous and must not block; it is called from the stream
/// relay's timer task and from the agent loop.
pub trait EventSink: Send + Sync {
    /// Deliver one event
    fn emit(&self, event: ChatEvent);
}

/// [`EventSink`] backed by an unbounded Tokio channel
///
/// # Examples
///
/// ```
/// use localchat::events::{ChannelSink, ChatEvent, EventSink};
///
/// let (sink, mut rx) = ChannelSink::new();
/// sink.emit(ChatEvent::StreamEnd { session_id: 1 });
/// assert_eq!(rx.try_recv().unwrap(), ChatEvent::StreamEnd { session_id: 1 });
/// ```
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ChatEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver the UI drains
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ChatEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: ChatEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Event receiver dropped; discarding event");
        }
    }
}
