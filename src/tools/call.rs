//! Tool-call detection in free-form model output
//!
//! Local models are prompted to answer with a bare JSON object
//! `{"tool_name": ..., "arguments": {...}}` when they want a tool. The
//! detector is deliberately lenient: it takes everything from the first `{`
//! to the last `}` of the response. Prose that merely contains braces (for
//! example a code sample) is mistaken for a tool call and then fails to
//! parse, which the agent loop reports back to the model as a tool error.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{ChatError, Result};

/// A parsed tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to run
    pub tool_name: String,
    /// Arguments object; empty when omitted or `null`
    #[serde(default, deserialize_with = "null_as_empty")]
    pub arguments: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ToolCall {
    /// Parse a tool-call candidate
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::ToolCallParse`] when the text is not an object
    /// with a string `tool_name` and an object, `null` or absent `arguments`.
    ///
    /// # Examples
    ///
    /// ```
    /// use localchat::tools::ToolCall;
    ///
    /// let call = ToolCall::parse(r#"{"tool_name":"search","arguments":{"q":"rust"}}"#).unwrap();
    /// assert_eq!(call.tool_name, "search");
    /// assert_eq!(call.arguments["q"], "rust");
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        let call: ToolCall = serde_json::from_str(raw)
            .map_err(|e| ChatError::ToolCallParse(format!("{} in {}", e, raw)))?;
        if call.tool_name.trim().is_empty() {
            return Err(ChatError::ToolCallParse("tool_name is empty".to_string()).into());
        }
        Ok(call)
    }
}

/// Extract a tool-call candidate from a model response
///
/// Returns the substring from the first `{` to the last `}` inclusive, or
/// `None` when there is no such pair.
///
/// # Examples
///
/// ```
/// use localchat::tools::detect_tool_call;
///
/// let response = r#"Sure. {"tool_name":"x","arguments":{}} Done."#;
/// assert_eq!(detect_tool_call(response), Some(r#"{"tool_name":"x","arguments":{}}"#));
/// assert_eq!(detect_tool_call("no braces here"), None);
/// ```
pub fn detect_tool_call(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&response[start..=end])
}
