//! History shaping helpers
//!
//! Pruning keeps agent-loop prompts bounded, reasoning stripping keeps
//! `<think>` spans out of the in-memory context, and session naming derives
//! a short display name from the first user message.

use std::sync::OnceLock;

use regex::Regex;

use crate::inference::{ChatMessage, Role};

fn think_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid think regex"))
}

fn channel_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<\|.*?\|>").expect("valid channel regex"))
}

/// Bound a history to its first entry plus the `window` most recent entries
///
/// Histories of at most `window + 1` entries are returned unchanged.
///
/// # Examples
///
/// ```
/// use localchat::agent::history::prune_history;
/// use localchat::inference::ChatMessage;
///
/// let history: Vec<ChatMessage> = (0..12).map(|i| ChatMessage::user(i.to_string())).collect();
/// let pruned = prune_history(&history, 8);
///
/// assert_eq!(pruned.len(), 9);
/// assert_eq!(pruned[0].content, "0");
/// assert_eq!(pruned[1].content, "4");
/// ```
pub fn prune_history(history: &[ChatMessage], window: usize) -> Vec<ChatMessage> {
    if history.len() <= window + 1 {
        return history.to_vec();
    }
    let mut pruned = Vec::with_capacity(window + 1);
    pruned.push(history[0].clone());
    pruned.extend_from_slice(&history[history.len() - window..]);
    pruned
}

/// Remove `<think>...</think>` spans and surrounding whitespace
pub fn strip_reasoning(text: &str) -> String {
    think_regex().replace_all(text, "").trim().to_string()
}

/// Copy of a stored history suitable for the in-memory context
///
/// Assistant messages lose their reasoning spans; other roles are kept as-is.
pub fn clean_history(history: &[ChatMessage]) -> Vec<ChatMessage> {
    history
        .iter()
        .map(|message| match message.role {
            Role::Assistant => ChatMessage::assistant(strip_reasoning(&message.content)),
            _ => message.clone(),
        })
        .collect()
}

/// Derive a session display name from a user message
///
/// Reasoning spans and `<|...|>` channel markers are dropped, the rest is
/// trimmed and cut to `max_chars` characters.
///
/// # Examples
///
/// ```
/// use localchat::agent::history::session_name_from;
///
/// assert_eq!(session_name_from("<|user|>Plan a trip to Lisbon in May", 20), "Plan a trip to Lisbo");
/// assert_eq!(session_name_from("  hi  ", 20), "hi");
/// ```
pub fn session_name_from(message: &str, max_chars: usize) -> String {
    let without_reasoning = think_regex().replace_all(message, "");
    let cleaned = channel_regex().replace_all(&without_reasoning, "");
    cleaned.trim().chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> Vec<ChatMessage> {
        (0..n).map(|i| ChatMessage::user(format!("m{}", i))).collect()
    }

    #[test]
    fn test_prune_keeps_short_history() {
        let history = numbered(9);
        assert_eq!(prune_history(&history, 8), history);
        assert!(prune_history(&[], 8).is_empty());
    }

    #[test]
    fn test_prune_anchors_first_message() {
        let history = numbered(20);
        let pruned = prune_history(&history, 8);

        assert_eq!(pruned.len(), 9);
        assert_eq!(pruned[0], history[0]);
        assert_eq!(&pruned[1..], &history[12..]);
    }

    #[test]
    fn test_prune_one_over_window() {
        let history = numbered(10);
        let pruned = prune_history(&history, 8);
        assert_eq!(pruned.len(), 9);
        assert_eq!(pruned[1].content, "m2");
    }

    #[test]
    fn test_strip_reasoning_multiline() {
        let raw = "<think>\nstep one\nstep two\n</think>\n\nThe answer is 4.";
        assert_eq!(strip_reasoning(raw), "The answer is 4.");
    }

    #[test]
    fn test_strip_reasoning_is_non_greedy() {
        let raw = "<think>a</think>keep<think>b</think> this";
        assert_eq!(strip_reasoning(raw), "keep this");
    }

    #[test]
    fn test_clean_history_only_touches_assistant() {
        let history = vec![
            ChatMessage::user("<think>literal</think> question"),
            ChatMessage::assistant("<think>hidden</think>answer"),
        ];
        let cleaned = clean_history(&history);
        assert_eq!(cleaned[0], history[0]);
        assert_eq!(cleaned[1].content, "answer");
    }

    #[test]
    fn test_session_name_is_char_safe() {
        let name = session_name_from("héllo wörld ünïcödé text", 10);
        assert_eq!(name.chars().count(), 10);
        assert_eq!(name, "héllo wörl");
    }

    #[test]
    fn test_session_name_strips_markers() {
        assert_eq!(
            session_name_from("<think>plan</think><|start|>assistant<|message|>Hello", 20),
            "assistantHello"
        );
    }
}
