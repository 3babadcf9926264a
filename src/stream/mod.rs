//! Streaming response delivery
//!
//! - `relay`: batches streamed deltas into UI events
//! - `stats`: token throughput bookkeeping

pub mod relay;
pub mod stats;

pub use relay::{RelayConfig, RelayOutcome, StreamRelay};
pub use stats::{TokenCounter, TokenStats};
