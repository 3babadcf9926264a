//! Agent loop metrics
//!
//! # Metrics
//!
//! - `agent_loop_runs_total`: Counter of tool-agent runs started
//! - `agent_loop_active_count`: Gauge of runs in progress
//! - `agent_loop_iterations`: Histogram of dispatch iterations per run
//! - `agent_loop_duration_seconds`: Histogram of run duration, by outcome
//! - `agent_loop_outcomes_total`: Counter of finished runs, by outcome
//! - `chat_requests_total`: Counter of handled chat messages, by path
//!
//! # Examples
//!
//! ```
//! use localchat::agent::metrics::{AgentLoopMetrics, LoopOutcome};
//!
//! let metrics = AgentLoopMetrics::start();
//! metrics.record(2, LoopOutcome::FinalAnswer);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use metrics::{decrement_gauge, histogram, increment_counter, increment_gauge};

/// How a tool-agent run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The model produced a final answer that was streamed
    FinalAnswer,
    /// The iteration cap was reached
    Exhausted,
    /// A dispatch call to the model failed
    DispatchFailed,
}

impl LoopOutcome {
    /// Metric label for the outcome
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopOutcome::FinalAnswer => "final_answer",
            LoopOutcome::Exhausted => "exhausted",
            LoopOutcome::DispatchFailed => "dispatch_failed",
        }
    }
}

/// Metrics for one run of the tool agent
///
/// The active gauge is decremented exactly once, either by [`record`] or on
/// drop when the run was abandoned.
///
/// [`record`]: AgentLoopMetrics::record
#[derive(Debug)]
pub struct AgentLoopMetrics {
    start: Instant,
    recorded: AtomicBool,
}

impl AgentLoopMetrics {
    /// Start tracking a run
    pub fn start() -> Self {
        increment_counter!("agent_loop_runs_total");
        increment_gauge!("agent_loop_active_count", 1.0);
        Self {
            start: Instant::now(),
            recorded: AtomicBool::new(false),
        }
    }

    /// Record the end of the run; later calls are ignored
    pub fn record(&self, iterations: usize, outcome: LoopOutcome) {
        if self.recorded.swap(true, Ordering::SeqCst) {
            return;
        }

        histogram!("agent_loop_iterations", iterations as f64);
        histogram!(
            "agent_loop_duration_seconds",
            self.start.elapsed().as_secs_f64(),
            "outcome" => outcome.as_str()
        );
        increment_counter!("agent_loop_outcomes_total", "outcome" => outcome.as_str());
        decrement_gauge!("agent_loop_active_count", 1.0);
    }

    /// Whether the run has been recorded
    pub fn is_recorded(&self) -> bool {
        self.recorded.load(Ordering::SeqCst)
    }

    /// Time since the run started
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Drop for AgentLoopMetrics {
    fn drop(&mut self) {
        if !self.is_recorded() {
            decrement_gauge!("agent_loop_active_count", 1.0);
        }
    }
}

/// Count a handled chat message by the path it took
pub fn record_chat_path(path: &'static str) {
    increment_counter!("chat_requests_total", "path" => path);
}

/// Initializes the metrics exporter for Prometheus
///
/// A no-op unless built with the `prometheus` feature.
///
/// # Examples
///
/// ```
/// use localchat::agent::metrics::init_metrics_exporter;
///
/// init_metrics_exporter();
/// ```
pub fn init_metrics_exporter() {
    #[cfg(feature = "prometheus")]
    {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let _ = builder.install().map_err(|e| {
            tracing::warn!("Failed to install Prometheus exporter: {}", e);
        });
    }
}
