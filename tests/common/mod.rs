use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use wiremock::ResponseTemplate;

use localchat::config::McpServerConfig;
use localchat::events::ChatEvent;
use localchat::storage::SqliteMessageStore;

#[allow(dead_code)]
pub fn create_temp_store() -> (SqliteMessageStore, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let store = SqliteMessageStore::new_with_path(tmp.path().join("chat.db"))
        .expect("failed to create sqlite store with path");
    (store, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// A non-streaming chat completion carrying `text`
#[allow(dead_code)]
pub fn completion(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": text } }]
    }))
}

/// A streaming chat completion emitting `deltas` then `[DONE]`
#[allow(dead_code)]
pub fn sse(deltas: &[&str]) -> ResponseTemplate {
    let mut body = String::new();
    for delta in deltas {
        let chunk = json!({ "choices": [{ "delta": { "content": delta } }] });
        body.push_str(&format!("data: {}\n\n", chunk));
    }
    body.push_str("data: [DONE]\n\n");
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

/// Path to the `mcp_test_server` helper binary
#[allow(dead_code)]
pub fn test_server_exe() -> PathBuf {
    if let Ok(p) = std::env::var("CARGO_BIN_EXE_mcp_test_server") {
        return PathBuf::from(p);
    }
    if let Ok(manifest) = std::env::var("CARGO_MANIFEST_DIR") {
        let debug = PathBuf::from(manifest)
            .join("target")
            .join("debug")
            .join("mcp_test_server");
        if debug.exists() {
            return debug;
        }
    }
    PathBuf::from("mcp_test_server")
}

#[allow(dead_code)]
pub fn test_server_config() -> McpServerConfig {
    McpServerConfig {
        command: test_server_exe().to_string_lossy().to_string(),
        description: "Integration test server".to_string(),
        ..Default::default()
    }
}

/// Every event already queued
#[allow(dead_code)]
pub fn drain(events: &mut UnboundedReceiver<ChatEvent>) -> Vec<ChatEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

/// Wait up to two seconds for an event matching `predicate`
#[allow(dead_code)]
pub async fn wait_for<F>(events: &mut UnboundedReceiver<ChatEvent>, predicate: F) -> ChatEvent
where
    F: Fn(&ChatEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match events.recv().await {
                Some(event) if predicate(&event) => return event,
                Some(_) => continue,
                None => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Concatenated text of every `StreamChunk`
#[allow(dead_code)]
pub fn streamed_text(events: &[ChatEvent]) -> String {
    events
        .iter()
        .filter_map(|event| match event {
            ChatEvent::StreamChunk { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}
