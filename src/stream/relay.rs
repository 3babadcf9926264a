//! Dual-trigger stream relay
//!
//! Forwards a [`DeltaStream`] to an [`EventSink`] in batches. A batch is
//! flushed when the buffer reaches `max_batch_chars` characters or when the
//! periodic timer fires, whichever comes first. When the delta stream ends
//! (exhausted, aborted, or failed) the relay:
//!
//! 1. stops the timer and waits for it to exit,
//! 2. flushes whatever is still buffered,
//! 3. hands the full concatenated text to the persistence callback once,
//! 4. emits exactly one [`ChatEvent::StreamEnd`].
//!
//! The timer task is also cancelled when the `run` future is dropped before
//! the stream ends, so no background work outlives the relay.
//!
//! Batches never overlap: a flush takes the emit-order lock before draining
//! the buffer, so the order of emitted batches matches the delta order and
//! their concatenation equals the full text.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::StreamConfig;
use crate::events::{ChatEvent, EventSink};
use crate::inference::DeltaStream;

/// Batching thresholds for a [`StreamRelay`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    /// Timer flush period
    pub batch_interval: Duration,
    /// Buffered characters that force a flush
    pub max_batch_chars: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::from(&StreamConfig::default())
    }
}

impl From<&StreamConfig> for RelayConfig {
    fn from(config: &StreamConfig) -> Self {
        Self {
            batch_interval: config.batch_interval(),
            max_batch_chars: config.max_batch_chars,
        }
    }
}

/// Result of relaying one stream
#[derive(Debug, Clone, PartialEq)]
pub struct RelayOutcome {
    /// Concatenation of every delta received
    pub text: String,
    /// Number of non-empty deltas received
    pub deltas: usize,
    /// Wall time from the first poll to the end of the stream
    pub elapsed: Duration,
    /// Whether the stream ended on a read error
    pub failed: bool,
}

#[derive(Debug, Default)]
struct BatchBuffer {
    text: String,
    chars: usize,
}

/// Buffer shared between the reading loop and the timer task
struct Batcher {
    buffer: Mutex<BatchBuffer>,
    emit_order: Mutex<()>,
    sink: Arc<dyn EventSink>,
    session_id: i64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Batcher {
    /// Append a delta and return the buffered character count
    fn push(&self, delta: &str) -> usize {
        let mut buffer = lock(&self.buffer);
        buffer.text.push_str(delta);
        buffer.chars += delta.chars().count();
        buffer.chars
    }

    /// Emit the buffered text as one batch; no-op when empty
    fn flush(&self) {
        let _order = lock(&self.emit_order);
        let text = {
            let mut buffer = lock(&self.buffer);
            buffer.chars = 0;
            std::mem::take(&mut buffer.text)
        };
        if !text.is_empty() {
            self.sink.emit(ChatEvent::StreamChunk {
                session_id: self.session_id,
                text,
            });
        }
    }
}

/// Relays streamed deltas to an event sink in batches
pub struct StreamRelay {
    sink: Arc<dyn EventSink>,
    config: RelayConfig,
}

impl StreamRelay {
    /// Create a relay that emits to `sink`
    pub fn new(sink: Arc<dyn EventSink>, config: RelayConfig) -> Self {
        Self { sink, config }
    }

    /// Batching thresholds in use
    pub fn config(&self) -> RelayConfig {
        self.config
    }

    /// Relay `deltas` until the stream ends
    ///
    /// `persist` is awaited exactly once with the full text, after the final
    /// flush and before the end-of-stream sentinel is emitted.
    ///
    /// # Arguments
    ///
    /// * `session_id` - Session stamped on every emitted event
    /// * `deltas` - Source stream; wrap it in `futures::stream::Abortable`
    ///   to make it stoppable
    /// * `persist` - Persistence hook for the full response text
    pub async fn run<F, Fut>(
        &self,
        session_id: i64,
        mut deltas: DeltaStream,
        persist: F,
    ) -> RelayOutcome
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = ()>,
    {
        let batcher = Arc::new(Batcher {
            buffer: Mutex::new(BatchBuffer::default()),
            emit_order: Mutex::new(()),
            sink: Arc::clone(&self.sink),
            session_id,
        });

        let stop = CancellationToken::new();
        // Stops the timer even when this future is dropped mid-stream
        let _stop_on_drop = stop.clone().drop_guard();
        let timer = {
            let batcher = Arc::clone(&batcher);
            let stop = stop.clone();
            let period = self.config.batch_interval;
            tokio::spawn(async move {
                let start = tokio::time::Instant::now() + period;
                let mut ticker = tokio::time::interval_at(start, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = stop.cancelled() => break,
                        _ = ticker.tick() => batcher.flush(),
                    }
                }
            })
        };

        let started = Instant::now();
        let mut text = String::new();
        let mut count = 0usize;
        let mut failed = false;

        while let Some(item) = deltas.next().await {
            match item {
                Ok(delta) if delta.is_empty() => {}
                Ok(delta) => {
                    text.push_str(&delta);
                    count += 1;
                    if batcher.push(&delta) >= self.config.max_batch_chars {
                        batcher.flush();
                    }
                }
                Err(e) => {
                    tracing::warn!("Stream for session {} ended with error: {}", session_id, e);
                    failed = true;
                    break;
                }
            }
        }
        let elapsed = started.elapsed();

        stop.cancel();
        if let Err(e) = timer.await {
            tracing::warn!("Batch timer task for session {} failed: {}", session_id, e);
        }
        batcher.flush();

        persist(text.clone()).await;
        self.sink.emit(ChatEvent::StreamEnd { session_id });

        tracing::debug!(
            "Relayed {} deltas ({} chars) for session {} in {:?}",
            count,
            text.len(),
            session_id,
            elapsed
        );

        RelayOutcome {
            text,
            deltas: count,
            elapsed,
            failed,
        }
    }
}
