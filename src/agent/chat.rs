//! Chat service
//!
//! [`ChatService`] is the single state holder a front end talks to. It owns
//! the conversation registry, the tool-server registry and the cooldown
//! table (through [`ToolRouter`]), and routes every user message either to
//! the standard streaming path or to the [`ToolAgent`].

use std::sync::Arc;

use chrono::Local;

use crate::agent::conversation::{lock, Conversation, ConversationHandle, ConversationRegistry};
use crate::agent::history::{clean_history, session_name_from};
use crate::agent::metrics::record_chat_path;
use crate::agent::responder::StreamResponder;
use crate::agent::tool_agent::ToolAgent;
use crate::config::{Config, McpServerConfig};
use crate::error::{ChatError, Result};
use crate::events::{ChatEvent, EventSink};
use crate::inference::{ChatMessage, InferenceClient, Role};
use crate::mcp::McpToolServer;
use crate::storage::{save_message_blocking, ChatSession, MessageStore, StoredMessage};
use crate::stream::{RelayConfig, TokenCounter};
use crate::tools::{ToolRouter, ToolServer, ToolServerRegistry};

/// Orchestrates sessions, streaming and tool use
pub struct ChatService {
    config: Config,
    store: Arc<dyn MessageStore>,
    sink: Arc<dyn EventSink>,
    conversations: ConversationRegistry,
    tool_servers: Arc<ToolServerRegistry>,
    router: Arc<ToolRouter>,
    responder: Arc<StreamResponder>,
    agent: ToolAgent,
    token_counter: Arc<TokenCounter>,
}

impl ChatService {
    /// Wire a service from its collaborators
    pub fn new(
        config: Config,
        inference: Arc<dyn InferenceClient>,
        store: Arc<dyn MessageStore>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let tool_servers = Arc::new(ToolServerRegistry::new());
        let router = Arc::new(ToolRouter::new(
            Arc::clone(&tool_servers),
            Arc::clone(&inference),
            config.agent.cooldown(),
        ));
        let token_counter = Arc::new(TokenCounter::new());
        let responder = Arc::new(StreamResponder::new(
            Arc::clone(&inference),
            Arc::clone(&store),
            Arc::clone(&sink),
            RelayConfig::from(&config.stream),
            Arc::clone(&token_counter),
        ));
        let agent = ToolAgent::new(
            Arc::clone(&router),
            inference,
            Arc::clone(&store),
            Arc::clone(&sink),
            Arc::clone(&responder),
            config.agent.clone(),
        );

        Self {
            config,
            store,
            sink,
            conversations: ConversationRegistry::new(),
            tool_servers,
            router,
            responder,
            agent,
            token_counter,
        }
    }

    /// Configuration the service was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Create a session and its in-memory conversation
    pub fn new_chat(&self, system_prompt: &str) -> Result<i64> {
        let name = format!("Chat {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
        let session_id = self.store.create_session(&name, system_prompt)?;
        self.conversations
            .insert(session_id, Conversation::new(system_prompt));
        tracing::info!(
            "New chat session {} created with system prompt: '{}'",
            session_id,
            system_prompt
        );
        Ok(session_id)
    }

    /// Load a stored session into memory
    ///
    /// The in-memory history gets assistant messages with reasoning
    /// stripped; the returned history is the raw stored one.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::SessionNotFound`] when the session does not exist.
    pub fn load_chat_history(&self, session_id: i64) -> Result<Vec<StoredMessage>> {
        let session = self
            .store
            .get_session(session_id)?
            .ok_or(ChatError::SessionNotFound(session_id))?;
        let stored = self.store.get_messages(session_id)?;
        tracing::info!(
            "Loaded {} messages for session {}",
            stored.len(),
            session_id
        );

        let history: Vec<ChatMessage> = stored
            .iter()
            .map(|m| ChatMessage::new(m.role, m.content.clone()))
            .collect();
        let conversation = self
            .conversations
            .get_or_insert_with(session_id, Conversation::default);
        {
            let mut conversation = lock(&conversation);
            conversation.replace_messages(clean_history(&history));
            conversation.set_system_prompt(session.system_prompt);
        }

        Ok(stored)
    }

    /// All stored sessions, newest first
    pub fn list_sessions(&self) -> Result<Vec<ChatSession>> {
        self.store.list_sessions()
    }

    /// Whether a session has an in-memory conversation
    pub fn is_loaded(&self, session_id: i64) -> bool {
        self.conversations.get(session_id).is_some()
    }

    /// Messages currently held in memory for a session
    pub fn conversation_messages(&self, session_id: i64) -> Option<Vec<ChatMessage>> {
        self.conversations
            .get(session_id)
            .map(|conversation| {
                let messages = lock(&conversation).messages().to_vec();
                messages
            })
    }

    /// System prompt of a loaded session
    pub fn system_prompt(&self, session_id: i64) -> Option<String> {
        self.conversations.get(session_id).map(|conversation| {
            let prompt = lock(&conversation).system_prompt().to_string();
            prompt
        })
    }

    /// Delete a session, stopping any stream it has in flight
    pub fn delete_session(&self, session_id: i64) -> Result<()> {
        if let Some(conversation) = self.conversations.remove(session_id) {
            if lock(&conversation).close() {
                tracing::info!("Stopped active stream of deleted session {}", session_id);
            }
        }
        self.token_counter.reset(session_id);
        self.store.delete_session(session_id)?;
        tracing::info!("Deleted session {}", session_id);
        Ok(())
    }

    /// Replace a loaded session's system prompt in memory and in storage
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::ConversationNotFound`] when the session is not
    /// loaded.
    pub fn update_system_prompt(&self, session_id: i64, system_prompt: &str) -> Result<()> {
        let conversation = self
            .conversations
            .get(session_id)
            .ok_or(ChatError::ConversationNotFound(session_id))?;
        lock(&conversation).set_system_prompt(system_prompt);
        self.store.update_system_prompt(session_id, system_prompt)?;
        tracing::info!("Updated system prompt of session {}", session_id);
        Ok(())
    }

    /// Abort the stream in flight for a session
    ///
    /// Returns `false` when the session is not loaded or nothing is
    /// streaming. The relay still persists the partial text and emits the
    /// end-of-stream event.
    pub fn stop_stream(&self, session_id: i64) -> bool {
        match self.conversations.get(session_id) {
            Some(conversation) => {
                let stopped = lock(&conversation).stop_stream();
                stopped
            }
            None => {
                tracing::warn!("Conversation with ID {} not found.", session_id);
                false
            }
        }
    }

    /// Handle one user message end to end
    ///
    /// The message is persisted and appended, the first message of a
    /// session is used to name it in the background, and the answer is
    /// produced by either the tool agent or the standard streaming path.
    /// Exactly one `StreamEnd` is emitted for the request.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::ConversationNotFound`] for an unloaded session,
    /// a storage error when the user message cannot be saved, and the
    /// inference error when no answer could be produced.
    pub async fn handle_chat(&self, session_id: i64, message: &str) -> Result<()> {
        let Some(conversation) = self.conversations.get(session_id) else {
            tracing::error!("Conversation with ID {} not found.", session_id);
            return Err(self.abort_request(
                session_id,
                ChatError::ConversationNotFound(session_id).into(),
            ));
        };

        if let Err(e) =
            save_message_blocking(&self.store, session_id, Role::User, message).await
        {
            tracing::error!("Error saving user message: {}", e);
            return Err(self.abort_request(session_id, e));
        }
        let is_first = {
            let mut conversation = lock(&conversation);
            conversation.push(ChatMessage::user(message));
            conversation.len() == 1
        };
        if is_first {
            self.spawn_session_naming(session_id, message);
        }

        match self.router.needs_tools(message).await {
            Ok(true) => {
                tracing::info!("Router decided tools are needed; starting tool agent");
                record_chat_path("tools");
                self.agent.run(session_id, &conversation).await
            }
            Ok(false) => {
                tracing::info!("Router decided no tools are needed; standard chat");
                record_chat_path("standard");
                self.standard_chat(session_id, &conversation).await
            }
            Err(e) => {
                tracing::warn!("Error checking for tool needs, using standard chat: {}", e);
                record_chat_path("fallback");
                self.standard_chat(session_id, &conversation).await
            }
        }
    }

    async fn standard_chat(&self, session_id: i64, conversation: &ConversationHandle) -> Result<()> {
        let messages = {
            let conversation = lock(conversation);
            let mut messages = Vec::with_capacity(conversation.len() + 1);
            if !conversation.system_prompt().is_empty() {
                messages.push(ChatMessage::system(conversation.system_prompt()));
            }
            messages.extend_from_slice(conversation.messages());
            messages
        };
        self.responder
            .respond(session_id, conversation, &messages)
            .await
            .map(|_| ())
    }

    fn abort_request(&self, session_id: i64, error: anyhow::Error) -> anyhow::Error {
        self.sink.emit(ChatEvent::Error {
            session_id,
            message: error.to_string(),
        });
        self.sink.emit(ChatEvent::StreamEnd { session_id });
        error
    }

    fn spawn_session_naming(&self, session_id: i64, message: &str) {
        let store = Arc::clone(&self.store);
        let sink = Arc::clone(&self.sink);
        let name = session_name_from(message, self.config.session.name_max_chars);
        tokio::task::spawn_blocking(move || {
            if name.is_empty() {
                tracing::debug!("Session {} keeps its default name", session_id);
                return;
            }
            if let Err(e) = store.update_session_name(session_id, &name) {
                tracing::error!("Error updating session name: {}", e);
                return;
            }
            tracing::info!("Session {} named '{}'", session_id, name);
            sink.emit(ChatEvent::SessionNameUpdated {
                session_id,
                new_name: name,
            });
        });
    }

    /// Register a tool server under its own name
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::AlreadyConnected`] when the name is taken.
    pub async fn connect_tool_server(&self, server: Arc<dyn ToolServer>) -> Result<()> {
        let name = server.name().to_string();
        self.tool_servers.insert(server).await?;
        tracing::info!("Tool server '{}' connected", name);
        Ok(())
    }

    /// Spawn and register a configured MCP server
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::AlreadyConnected`] before spawning anything when
    /// the name is taken, and the spawn or handshake error otherwise.
    pub async fn connect_mcp_server(&self, name: &str, config: &McpServerConfig) -> Result<()> {
        if self.tool_servers.contains(name).await {
            return Err(ChatError::AlreadyConnected(name.to_string()).into());
        }
        let server =
            McpToolServer::connect(name, config, self.config.mcp.request_timeout()).await?;
        self.connect_tool_server(Arc::new(server)).await
    }

    /// Connect every configured server flagged `auto_connect`
    ///
    /// Failures are logged and skipped. Returns the names that connected.
    pub async fn auto_connect_servers(&self) -> Vec<String> {
        let mut connected = Vec::new();
        for (name, server) in &self.config.mcp.servers {
            if !server.auto_connect {
                continue;
            }
            match self.connect_mcp_server(name, server).await {
                Ok(()) => connected.push(name.clone()),
                Err(e) => tracing::warn!("Failed to connect MCP server '{}': {}", name, e),
            }
        }
        connected
    }

    /// Disconnect and forget a tool server; unknown names are ignored
    pub async fn disconnect_tool_server(&self, name: &str) -> bool {
        match self.tool_servers.remove(name).await {
            Some(server) => {
                server.disconnect().await;
                tracing::info!("Tool server '{}' disconnected", name);
                true
            }
            None => false,
        }
    }

    /// Names of the connected tool servers, sorted
    pub async fn connected_tool_servers(&self) -> Vec<String> {
        self.tool_servers.names().await
    }

    /// Current tool manifest
    pub async fn tool_manifest(&self) -> String {
        self.router.tool_manifest().await
    }

    /// Disconnect every tool server
    pub async fn shutdown(&self) {
        for server in self.tool_servers.drain().await {
            server.disconnect().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{temp_store, tool, RecordingSink, ScriptedInference, StaticToolServer};
    use std::time::Duration;

    struct Fixture {
        service: ChatService,
        inference: Arc<ScriptedInference>,
        store: Arc<dyn MessageStore>,
        sink: Arc<RecordingSink>,
        _dir: tempfile::TempDir,
    }

    fn fixture(inference: ScriptedInference) -> Fixture {
        let (store, dir) = temp_store();
        let store: Arc<dyn MessageStore> = Arc::new(store);
        let inference = Arc::new(inference);
        let sink = Arc::new(RecordingSink::default());
        let mut config = Config::default();
        config.stream.batch_interval_ms = 10;
        let service = ChatService::new(config, inference.clone(), Arc::clone(&store), sink.clone());
        Fixture {
            service,
            inference,
            store,
            sink,
            _dir: dir,
        }
    }

    async fn wait_for_name(sink: &RecordingSink, session_id: i64) -> Option<String> {
        for _ in 0..200 {
            let name = sink.events().into_iter().find_map(|event| match event {
                ChatEvent::SessionNameUpdated {
                    session_id: id,
                    new_name,
                } if id == session_id => Some(new_name),
                _ => None,
            });
            if name.is_some() {
                return name;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        None
    }

    #[tokio::test]
    async fn test_standard_path_without_tool_servers() {
        let f = fixture(ScriptedInference::new().with_stream(&["Hi ", "there"]));
        let id = f.service.new_chat("Be brief.").unwrap();

        f.service.handle_chat(id, "Hello").await.unwrap();

        assert_eq!(f.inference.complete_calls(), 0);
        let request = &f.inference.stream_requests()[0];
        assert_eq!(
            request,
            &vec![ChatMessage::system("Be brief."), ChatMessage::user("Hello")]
        );
        assert_eq!(f.sink.streamed_text(id), "Hi there");
        assert_eq!(f.sink.end_count(id), 1);

        let stored: Vec<(Role, String)> = f
            .store
            .get_messages(id)
            .unwrap()
            .into_iter()
            .map(|m| (m.role, m.content))
            .collect();
        assert_eq!(
            stored,
            vec![
                (Role::User, "Hello".to_string()),
                (Role::Assistant, "Hi there".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_system_prompt_is_omitted() {
        let f = fixture(ScriptedInference::new());
        let id = f.service.new_chat("").unwrap();

        f.service.handle_chat(id, "Hello").await.unwrap();

        assert_eq!(
            f.inference.stream_requests()[0],
            vec![ChatMessage::user("Hello")]
        );
    }

    #[tokio::test]
    async fn test_first_message_names_session() {
        let f = fixture(ScriptedInference::new().with_stream(&["ok"]));
        let id = f.service.new_chat("").unwrap();

        f.service
            .handle_chat(id, "<think>x</think>What is the capital of France?")
            .await
            .unwrap();

        let name = wait_for_name(&f.sink, id).await;
        assert_eq!(name.as_deref(), Some("What is the capital "));
        assert_eq!(
            f.store.get_session(id).unwrap().unwrap().name,
            "What is the capital "
        );
    }

    #[tokio::test]
    async fn test_later_messages_do_not_rename() {
        let f = fixture(ScriptedInference::new().with_stream(&["a"]).with_stream(&["b"]));
        let id = f.service.new_chat("").unwrap();

        f.service.handle_chat(id, "first").await.unwrap();
        assert!(wait_for_name(&f.sink, id).await.is_some());
        f.service.handle_chat(id, "second").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let renames = f
            .sink
            .events()
            .into_iter()
            .filter(|e| matches!(e, ChatEvent::SessionNameUpdated { .. }))
            .count();
        assert_eq!(renames, 1);
    }

    #[tokio::test]
    async fn test_unknown_conversation_is_rejected() {
        let f = fixture(ScriptedInference::new());

        let err = f.service.handle_chat(99, "hello").await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ChatError>(),
            Some(ChatError::ConversationNotFound(99))
        ));
        assert_eq!(f.sink.end_count(99), 1);
        assert_eq!(f.inference.stream_calls(), 0);
    }

    #[tokio::test]
    async fn test_router_yes_runs_tool_agent() {
        let inference = ScriptedInference::new()
            .with_completion(" YES ")
            .with_completion(r#"{"tool_name":"clock","arguments":{}}"#)
            .with_completion("done")
            .with_stream(&["It is noon."]);
        let f = fixture(inference);
        f.service
            .connect_tool_server(Arc::new(
                StaticToolServer::new("time", &[tool("clock")]).with_response("clock", "12:00"),
            ))
            .await
            .unwrap();
        let id = f.service.new_chat("").unwrap();

        f.service.handle_chat(id, "What time is it?").await.unwrap();

        assert_eq!(f.inference.complete_calls(), 3);
        let messages = f.service.conversation_messages(id).unwrap();
        assert_eq!(messages[2].content, "12:00");
        assert_eq!(messages.last().unwrap().content, "It is noon.");
        assert_eq!(f.sink.end_count(id), 1);
    }

    #[tokio::test]
    async fn test_router_failure_falls_back_to_standard() {
        let inference = ScriptedInference::new()
            .with_completion_error("dispatcher down")
            .with_stream(&["fallback"]);
        let f = fixture(inference);
        f.service
            .connect_tool_server(Arc::new(StaticToolServer::new("time", &[tool("clock")])))
            .await
            .unwrap();
        let id = f.service.new_chat("").unwrap();

        f.service.handle_chat(id, "hi").await.unwrap();

        assert_eq!(f.sink.streamed_text(id), "fallback");
        assert_eq!(f.inference.stream_requests()[0], vec![ChatMessage::user("hi")]);
    }

    #[tokio::test]
    async fn test_router_no_uses_standard_path() {
        let inference = ScriptedInference::new()
            .with_completion("No.")
            .with_stream(&["plain"]);
        let f = fixture(inference);
        f.service
            .connect_tool_server(Arc::new(StaticToolServer::new("time", &[tool("clock")])))
            .await
            .unwrap();
        let id = f.service.new_chat("").unwrap();

        f.service.handle_chat(id, "hi").await.unwrap();

        assert_eq!(f.inference.complete_calls(), 1);
        assert_eq!(f.sink.streamed_text(id), "plain");
    }

    #[tokio::test]
    async fn test_load_history_strips_reasoning_in_memory() {
        let f = fixture(ScriptedInference::new());
        let id = f.store.create_session("old", "Stored prompt").unwrap();
        f.store.save_message(id, Role::User, "q").unwrap();
        f.store
            .save_message(id, Role::Assistant, "<think>r</think>answer")
            .unwrap();

        let stored = f.service.load_chat_history(id).unwrap();

        assert_eq!(stored[1].content, "<think>r</think>answer");
        assert_eq!(
            f.service.conversation_messages(id).unwrap(),
            vec![ChatMessage::user("q"), ChatMessage::assistant("answer")]
        );
        f.service.handle_chat(id, "next").await.unwrap();
        assert_eq!(
            f.inference.stream_requests()[0][0],
            ChatMessage::system("Stored prompt")
        );
    }

    #[tokio::test]
    async fn test_load_missing_session_fails() {
        let f = fixture(ScriptedInference::new());
        let err = f.service.load_chat_history(404).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChatError>(),
            Some(ChatError::SessionNotFound(404))
        ));
        assert!(!f.service.is_loaded(404));
    }

    #[tokio::test]
    async fn test_update_system_prompt_requires_loaded_session() {
        let f = fixture(ScriptedInference::new());
        let id = f.store.create_session("cold", "").unwrap();
        assert!(f.service.update_system_prompt(id, "new").is_err());

        f.service.load_chat_history(id).unwrap();
        f.service.update_system_prompt(id, "new").unwrap();
        assert_eq!(f.store.get_session(id).unwrap().unwrap().system_prompt, "new");
    }

    #[tokio::test]
    async fn test_delete_session_drops_everything() {
        let f = fixture(ScriptedInference::new().with_stream(&["x"]));
        let id = f.service.new_chat("").unwrap();
        f.service.handle_chat(id, "hello").await.unwrap();

        f.service.delete_session(id).unwrap();

        assert!(!f.service.is_loaded(id));
        assert!(f.store.get_session(id).unwrap().is_none());
        assert!(!f.service.stop_stream(id));
    }

    #[tokio::test]
    async fn test_stop_stream_ends_request() {
        let f = fixture(ScriptedInference::new().with_endless_stream(&["thinking..."]));
        let service = Arc::new(f.service);
        let id = service.new_chat("").unwrap();

        let request = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.handle_chat(id, "long question").await })
        };

        let mut stopped = false;
        for _ in 0..200 {
            if service.stop_stream(id) {
                stopped = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(stopped);

        tokio::time::timeout(Duration::from_secs(2), request)
            .await
            .expect("request did not finish")
            .unwrap()
            .unwrap();
        assert_eq!(f.sink.end_count(id), 1);
        assert_eq!(
            service.conversation_messages(id).unwrap().last().unwrap().content,
            "thinking..."
        );
    }

    #[tokio::test]
    async fn test_delete_during_stream_records_nothing() {
        let f = fixture(ScriptedInference::new().with_endless_stream(&["partial"]));
        let service = Arc::new(f.service);
        let id = service.new_chat("").unwrap();

        let request = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.handle_chat(id, "long question").await })
        };
        let mut streaming = false;
        for _ in 0..200 {
            if f.sink.streamed_text(id) == "partial" {
                streaming = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(streaming);

        service.delete_session(id).unwrap();
        tokio::time::timeout(Duration::from_secs(2), request)
            .await
            .expect("request did not finish")
            .unwrap()
            .unwrap();

        assert!(f.store.get_session(id).unwrap().is_none());
        assert!(f.store.get_messages(id).unwrap().is_empty());
        assert_eq!(service.token_counter.session_total(id), 0);
        assert_eq!(f.sink.end_count(id), 1);
        assert!(!f
            .sink
            .events()
            .iter()
            .any(|e| matches!(e, ChatEvent::TokenStats { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_tool_server_is_rejected() {
        let f = fixture(ScriptedInference::new());
        f.service
            .connect_tool_server(Arc::new(StaticToolServer::new("a", &[])))
            .await
            .unwrap();
        let err = f
            .service
            .connect_tool_server(Arc::new(StaticToolServer::new("a", &[])))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChatError>(),
            Some(ChatError::AlreadyConnected(name)) if name == "a"
        ));

        let err = f
            .service
            .connect_mcp_server(
                "a",
                &McpServerConfig {
                    command: "/nonexistent/mcp".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChatError>(),
            Some(ChatError::AlreadyConnected(_))
        ));
    }

    #[tokio::test]
    async fn test_disconnect_tool_server() {
        let f = fixture(ScriptedInference::new());
        f.service
            .connect_tool_server(Arc::new(StaticToolServer::new("a", &[tool("x")])))
            .await
            .unwrap();
        assert_eq!(f.service.connected_tool_servers().await, vec!["a"]);

        assert!(f.service.disconnect_tool_server("a").await);
        assert!(!f.service.disconnect_tool_server("a").await);
        assert!(f.service.connected_tool_servers().await.is_empty());
    }

    #[tokio::test]
    async fn test_auto_connect_skips_failures() {
        let (store, _dir) = temp_store();
        let mut config = Config::default();
        config.mcp.servers.insert(
            "broken".to_string(),
            McpServerConfig {
                command: "/nonexistent/mcp-server".to_string(),
                auto_connect: true,
                ..Default::default()
            },
        );
        config.mcp.servers.insert(
            "manual".to_string(),
            McpServerConfig {
                command: "/nonexistent/other".to_string(),
                ..Default::default()
            },
        );
        let service = ChatService::new(
            config,
            Arc::new(ScriptedInference::new()),
            Arc::new(store),
            Arc::new(RecordingSink::default()),
        );

        assert!(service.auto_connect_servers().await.is_empty());
        assert!(service.connected_tool_servers().await.is_empty());
    }
}
