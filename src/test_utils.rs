//! Test utilities for LocalChat
//!
//! Recording event sinks, scripted inference backends and static tool
//! servers shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tempfile::TempDir;

use crate::error::{ChatError, Result};
use crate::events::{ChatEvent, EventSink};
use crate::inference::{ChatMessage, DeltaStream, InferenceClient};
use crate::storage::SqliteMessageStore;
use crate::tools::{ToolDescriptor, ToolOutput, ToolServer};

/// [`EventSink`] that keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ChatEvent>>,
}

impl RecordingSink {
    /// All events received so far
    pub fn events(&self) -> Vec<ChatEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Texts of the stream chunks emitted for a session
    pub fn chunks(&self, session_id: i64) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ChatEvent::StreamChunk {
                    session_id: id,
                    text,
                } if id == session_id => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Concatenated stream text for a session
    pub fn streamed_text(&self, session_id: i64) -> String {
        self.chunks(session_id).concat()
    }

    /// Number of end-of-stream sentinels emitted for a session
    pub fn end_count(&self, session_id: i64) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, ChatEvent::StreamEnd { session_id: id } if *id == session_id))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: ChatEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// A finite stream yielding the given deltas
pub fn delta_stream_of(deltas: &[&str]) -> DeltaStream {
    let items: Vec<Result<String>> = deltas.iter().map(|d| Ok(d.to_string())).collect();
    Box::pin(futures::stream::iter(items))
}

/// Create a store in a fresh temporary directory
///
/// Keep the returned `TempDir` alive for as long as the store is used.
pub fn temp_store() -> (SqliteMessageStore, TempDir) {
    let dir = TempDir::new().expect("Failed to create temporary directory");
    let store = SqliteMessageStore::new_with_path(dir.path().join("chat.db"))
        .expect("Failed to create store");
    (store, dir)
}

/// What a scripted `stream` call produces
#[derive(Debug, Clone)]
pub enum StreamScript {
    /// Yield these deltas, then end
    Deltas(Vec<String>),
    /// Yield these deltas, then stay open until aborted
    Endless(Vec<String>),
    /// Fail to open the stream
    Fail(String),
}

/// [`InferenceClient`] answering from queued scripts
#[derive(Debug, Default)]
pub struct ScriptedInference {
    completions: Mutex<VecDeque<std::result::Result<String, String>>>,
    fallback_completion: Option<String>,
    streams: Mutex<VecDeque<StreamScript>>,
    complete_requests: Mutex<Vec<Vec<ChatMessage>>>,
    stream_requests: Mutex<Vec<Vec<ChatMessage>>>,
    complete_calls: AtomicUsize,
    stream_calls: AtomicUsize,
}

impl ScriptedInference {
    /// Create a backend with nothing scripted
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful non-streaming completion
    pub fn with_completion(self, text: &str) -> Self {
        self.completions
            .lock()
            .unwrap()
            .push_back(Ok(text.to_string()));
        self
    }

    /// Queue a failing non-streaming completion
    pub fn with_completion_error(self, message: &str) -> Self {
        self.completions
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    /// Completion returned once the queue is exhausted
    pub fn always_complete(mut self, text: &str) -> Self {
        self.fallback_completion = Some(text.to_string());
        self
    }

    /// Queue a finite stream
    pub fn with_stream(self, deltas: &[&str]) -> Self {
        self.push_stream(StreamScript::Deltas(
            deltas.iter().map(|d| d.to_string()).collect(),
        ))
    }

    /// Queue a stream that never ends on its own
    pub fn with_endless_stream(self, deltas: &[&str]) -> Self {
        self.push_stream(StreamScript::Endless(
            deltas.iter().map(|d| d.to_string()).collect(),
        ))
    }

    /// Queue a stream that fails to open
    pub fn with_stream_error(self, message: &str) -> Self {
        self.push_stream(StreamScript::Fail(message.to_string()))
    }

    fn push_stream(self, script: StreamScript) -> Self {
        self.streams.lock().unwrap().push_back(script);
        self
    }

    /// Number of `complete` calls made
    pub fn complete_calls(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }

    /// Number of `stream` calls made
    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    /// Message lists passed to `complete`, in call order
    pub fn completion_requests(&self) -> Vec<Vec<ChatMessage>> {
        self.complete_requests.lock().unwrap().clone()
    }

    /// Message lists passed to `stream`, in call order
    pub fn stream_requests(&self) -> Vec<Vec<ChatMessage>> {
        self.stream_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceClient for ScriptedInference {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        self.complete_requests
            .lock()
            .unwrap()
            .push(messages.to_vec());

        let next = self.completions.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(ChatError::Transport(message).into()),
            None => self
                .fallback_completion
                .clone()
                .ok_or_else(|| ChatError::Inference("no scripted completion".into()).into()),
        }
    }

    async fn stream(&self, messages: &[ChatMessage]) -> Result<DeltaStream> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.stream_requests.lock().unwrap().push(messages.to_vec());

        let script = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(StreamScript::Deltas(Vec::new()));

        match script {
            StreamScript::Deltas(deltas) => {
                let items: Vec<Result<String>> = deltas.into_iter().map(Ok).collect();
                Ok(Box::pin(futures::stream::iter(items)))
            }
            StreamScript::Endless(deltas) => {
                let items: Vec<Result<String>> = deltas.into_iter().map(Ok).collect();
                Ok(Box::pin(futures::StreamExt::chain(
                    futures::stream::iter(items),
                    futures::stream::pending(),
                )))
            }
            StreamScript::Fail(message) => Err(ChatError::Transport(message).into()),
        }
    }
}

/// [`ToolServer`] with a fixed tool list and canned responses
#[derive(Debug)]
pub struct StaticToolServer {
    name: String,
    tools: Vec<ToolDescriptor>,
    responses: HashMap<String, String>,
    call_error: Option<String>,
    list_fails: bool,
    calls: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl StaticToolServer {
    /// Create a server offering `tools`
    pub fn new(name: &str, tools: &[ToolDescriptor]) -> Self {
        Self {
            name: name.to_string(),
            tools: tools.to_vec(),
            responses: HashMap::new(),
            call_error: None,
            list_fails: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Text returned when `tool` is called
    pub fn with_response(mut self, tool: &str, text: &str) -> Self {
        self.responses.insert(tool.to_string(), text.to_string());
        self
    }

    /// Make every call fail with `message`
    pub fn failing_call(mut self, message: &str) -> Self {
        self.call_error = Some(message.to_string());
        self
    }

    /// Make tool listing fail
    pub fn failing_list(mut self) -> Self {
        self.list_fails = true;
        self
    }

    /// Calls received so far as (tool, arguments)
    pub fn calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolServer for StaticToolServer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        if self.list_fails {
            return Err(ChatError::Mcp(format!("{} cannot list tools", self.name)).into());
        }
        Ok(self.tools.clone())
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<ToolOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments));
        if let Some(message) = &self.call_error {
            return Err(ChatError::Mcp(message.clone()).into());
        }
        let text = self
            .responses
            .get(name)
            .cloned()
            .unwrap_or_else(|| format!("{} done", name));
        Ok(ToolOutput::text([text]))
    }
}

/// Tool descriptor with an empty schema
pub fn tool(name: &str) -> ToolDescriptor {
    ToolDescriptor {
        name: name.to_string(),
        description: format!("{} tool", name),
        input_schema: Value::Object(Map::new()),
    }
}
