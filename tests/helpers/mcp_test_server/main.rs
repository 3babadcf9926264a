//! Stdio MCP server used by the integration tests
//!
//! Reads newline-delimited JSON-RPC from stdin and answers on stdout.
//!
//! Tools:
//!
//! - `echo`  -- returns `arguments.message`
//! - `add`   -- returns the sum of `arguments.a` and `arguments.b`
//! - `fail`  -- returns a result flagged `isError`
//!
//! `initialize`, `tools/list`, `tools/call` and `ping` are answered;
//! `notifications/initialized` is swallowed; anything else gets
//! `-32601 Method not found`.

use std::io::{self, BufRead, Write};

use serde_json::{json, Value};

fn main() {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(trimmed) {
            Ok(request) => match dispatch(&request) {
                Some(response) => response,
                None => continue,
            },
            Err(_) => error(&Value::Null, -32700, "Parse error"),
        };

        if writeln!(out, "{}", response).is_err() || out.flush().is_err() {
            break;
        }
    }
}

fn dispatch(request: &Value) -> Option<Value> {
    let method = request["method"].as_str().unwrap_or("");
    let id = request.get("id").cloned().unwrap_or(Value::Null);

    let response = match method {
        "notifications/initialized" => return None,
        "initialize" => result(
            &id,
            json!({
                "protocolVersion": "2025-11-25",
                "capabilities": { "tools": {} },
                "serverInfo": { "name": "mcp-test-server", "version": "0.1.0" }
            }),
        ),
        "tools/list" => result(&id, json!({ "tools": tool_list() })),
        "tools/call" => call_tool(&id, &request["params"]),
        "ping" => result(&id, json!({})),
        _ => error(&id, -32601, &format!("Method not found: {}", method)),
    };
    Some(response)
}

fn tool_list() -> Value {
    json!([
        {
            "name": "echo",
            "description": "Echoes the message back",
            "inputSchema": {
                "type": "object",
                "properties": { "message": { "type": "string" } },
                "required": ["message"]
            }
        },
        {
            "name": "add",
            "description": "Adds two numbers",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "a": { "type": "number" },
                    "b": { "type": "number" }
                },
                "required": ["a", "b"]
            }
        },
        {
            "name": "fail",
            "description": "Always reports a tool error",
            "inputSchema": { "type": "object", "properties": {} }
        }
    ])
}

fn call_tool(id: &Value, params: &Value) -> Value {
    let arguments = &params["arguments"];
    match params["name"].as_str().unwrap_or("") {
        "echo" => text_result(id, arguments["message"].as_str().unwrap_or(""), false),
        "add" => {
            let sum = arguments["a"].as_f64().unwrap_or(0.0) + arguments["b"].as_f64().unwrap_or(0.0);
            text_result(id, &sum.to_string(), false)
        }
        "fail" => text_result(id, "tool failed on purpose", true),
        other => error(id, -32602, &format!("Unknown tool: {}", other)),
    }
}

fn text_result(id: &Value, text: &str, is_error: bool) -> Value {
    result(
        id,
        json!({
            "content": [{ "type": "text", "text": text }],
            "isError": is_error
        }),
    )
}

fn result(id: &Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn error(id: &Value, code: i32, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message }
    })
}
