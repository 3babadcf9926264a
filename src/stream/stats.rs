//! Token throughput statistics
//!
//! Counts are estimated with the characters / 4 heuristic; llama-server
//! does not report usage on streamed responses.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use metrics::histogram;

/// Throughput of one finished response
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenStats {
    /// Approximate tokens in the response
    pub tokens: usize,
    /// Approximate tokens per second over the stream duration
    pub tokens_per_second: f64,
    /// Running total for the session, including this response
    pub session_total: usize,
}

/// Estimate the token count of a string
///
/// # Examples
///
/// ```
/// use localchat::stream::stats::estimate_tokens;
///
/// assert_eq!(estimate_tokens(""), 0);
/// assert_eq!(estimate_tokens("abcd"), 1);
/// assert_eq!(estimate_tokens("abcde"), 2);
/// ```
pub fn estimate_tokens(text: &str) -> usize {
    (text.chars().count() + 3) / 4
}

/// Per-session running token totals
#[derive(Debug, Default)]
pub struct TokenCounter {
    session_totals: Mutex<HashMap<i64, usize>>,
}

impl TokenCounter {
    /// Create an empty counter
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished response and return its statistics
    pub fn record(&self, session_id: i64, text: &str, elapsed: Duration) -> TokenStats {
        let tokens = estimate_tokens(text);
        let secs = elapsed.as_secs_f64();
        let tokens_per_second = if secs > 0.0 {
            tokens as f64 / secs
        } else {
            0.0
        };

        let session_total = {
            let mut totals = self
                .session_totals
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let total = totals.entry(session_id).or_insert(0);
            *total += tokens;
            *total
        };

        histogram!("stream_tokens_per_second", tokens_per_second);

        TokenStats {
            tokens,
            tokens_per_second,
            session_total,
        }
    }

    /// Running total for a session
    pub fn session_total(&self, session_id: i64) -> usize {
        self.session_totals
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&session_id)
            .copied()
            .unwrap_or(0)
    }

    /// Forget a session's total
    pub fn reset(&self, session_id: i64) {
        self.session_totals
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&session_id);
    }
}
