//! In-memory conversation state
//!
//! Each active session owns one [`Conversation`] behind its own mutex, held
//! in a [`ConversationRegistry`] keyed by session id. Both locks are plain
//! `std::sync::Mutex`es: they only guard in-memory mutation and a guard
//! cannot be held across an `.await`, so no lock ever spans a network call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::stream::AbortHandle;

use crate::inference::ChatMessage;

/// Shared handle to a session's conversation
pub type ConversationHandle = Arc<Mutex<Conversation>>;

/// Lock a mutex, recovering the data from a poisoned lock
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Message history, system prompt and in-flight stream of one session
///
/// # Examples
///
/// ```
/// use localchat::agent::Conversation;
/// use localchat::inference::ChatMessage;
///
/// let mut conversation = Conversation::new("Be brief.");
/// conversation.push(ChatMessage::user("Hello"));
///
/// assert_eq!(conversation.len(), 1);
/// assert_eq!(conversation.system_prompt(), "Be brief.");
/// assert!(!conversation.stop_stream());
/// ```
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    system_prompt: String,
    active_stream: Option<AbortHandle>,
    closed: bool,
}

impl Conversation {
    /// Create an empty conversation with the given system prompt
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            system_prompt: system_prompt.into(),
            active_stream: None,
            closed: false,
        }
    }

    /// Messages in insertion order
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the conversation has no messages
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a message
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Replace the whole history, e.g. after reloading from storage
    pub fn replace_messages(&mut self, messages: Vec<ChatMessage>) {
        self.messages = messages;
    }

    /// Current system prompt; empty when unset
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Replace the system prompt
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = prompt.into();
    }

    /// Record the abort handle of the stream now being relayed
    pub fn set_active_stream(&mut self, handle: AbortHandle) {
        self.active_stream = Some(handle);
    }

    /// Forget the active stream without aborting it
    pub fn clear_active_stream(&mut self) {
        self.active_stream = None;
    }

    /// Whether a stream is currently being relayed
    pub fn has_active_stream(&self) -> bool {
        self.active_stream.is_some()
    }

    /// Abort the in-flight stream, if any
    ///
    /// Returns `true` when a stream was aborted. The relay observes the
    /// abort as the end of the stream and finishes normally.
    pub fn stop_stream(&mut self) -> bool {
        match self.active_stream.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Mark the session as deleted and abort its stream
    ///
    /// A closed conversation accepts no further answers: an in-flight relay
    /// still ends its stream but records nothing. Returns `true` when a
    /// stream was aborted.
    pub fn close(&mut self) -> bool {
        self.closed = true;
        self.stop_stream()
    }

    /// Whether the session was deleted
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Session id to conversation mapping
///
/// The registry lock is held only for map lookups and updates; callers then
/// lock the individual conversation.
#[derive(Debug, Default)]
pub struct ConversationRegistry {
    conversations: Mutex<HashMap<i64, ConversationHandle>>,
}

impl ConversationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Conversation for a session, if one is loaded
    pub fn get(&self, session_id: i64) -> Option<ConversationHandle> {
        lock(&self.conversations).get(&session_id).cloned()
    }

    /// Install a conversation, replacing any previous one
    pub fn insert(&self, session_id: i64, conversation: Conversation) -> ConversationHandle {
        let handle = Arc::new(Mutex::new(conversation));
        lock(&self.conversations).insert(session_id, Arc::clone(&handle));
        handle
    }

    /// Existing conversation, or a new one built by `init`
    pub fn get_or_insert_with<F>(&self, session_id: i64, init: F) -> ConversationHandle
    where
        F: FnOnce() -> Conversation,
    {
        let mut conversations = lock(&self.conversations);
        Arc::clone(
            conversations
                .entry(session_id)
                .or_insert_with(|| Arc::new(Mutex::new(init()))),
        )
    }

    /// Drop a session's conversation and return it
    pub fn remove(&self, session_id: i64) -> Option<ConversationHandle> {
        lock(&self.conversations).remove(&session_id)
    }

    /// Number of loaded conversations
    pub fn len(&self) -> usize {
        lock(&self.conversations).len()
    }

    /// Whether no conversation is loaded
    pub fn is_empty(&self) -> bool {
        lock(&self.conversations).is_empty()
    }
}
