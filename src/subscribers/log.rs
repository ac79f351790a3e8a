//! # LogWriter - queue events as `tracing` records
//!
//! A subscriber that renders incoming [`Event`]s through the `tracing` facade.
//! Installing a `tracing` subscriber (fmt, json, ...) is left to the application.
//!
//! ## Levels
//! - `warn`: exhausted deliveries, failure-handler panics, subscriber overflow/panic,
//!   grace exceeded
//! - `info`: successful deliveries, shutdown
//! - `debug`: everything else (queueing, attempts, retries)

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let id = e.message.as_deref().unwrap_or("-");
        let channel = e.channel.map(|c| c.as_str()).unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::MessageQueued => debug!(seq = e.seq, id, channel, "message queued"),
            EventKind::EntryReplaced => {
                debug!(seq = e.seq, id, channel, state = reason, "entry replaced")
            }
            EventKind::AttemptStarting => {
                debug!(seq = e.seq, id, channel, attempt = e.attempt, "attempt starting")
            }
            EventKind::AttemptSucceeded => {
                info!(seq = e.seq, id, channel, attempt = e.attempt, "delivered")
            }
            EventKind::AttemptFailed => {
                debug!(seq = e.seq, id, channel, attempt = e.attempt, err = reason, "attempt failed")
            }
            EventKind::TimeoutHit => {
                debug!(seq = e.seq, id, channel, timeout_ms = e.timeout_ms, "attempt timed out")
            }
            EventKind::RetryScheduled => debug!(
                seq = e.seq,
                id,
                channel,
                after_attempt = e.attempt,
                delay_ms = e.delay_ms,
                err = reason,
                "retry scheduled"
            ),
            EventKind::DeliveryExhausted => warn!(
                seq = e.seq,
                id,
                channel,
                attempts = e.attempt,
                err = reason,
                "delivery permanently failed"
            ),
            EventKind::FailureHandlerPanicked => {
                warn!(seq = e.seq, id, info = reason, "failure handler panicked")
            }
            EventKind::QueueIdle => debug!(seq = e.seq, "queue idle"),
            EventKind::ShutdownRequested => info!(seq = e.seq, "shutdown requested"),
            EventKind::ShutdownComplete => info!(seq = e.seq, "shutdown complete"),
            EventKind::GraceExceeded => warn!(seq = e.seq, "shutdown grace exceeded"),
            EventKind::SubscriberOverflow => warn!(
                seq = e.seq,
                subscriber = e.subscriber.unwrap_or("unknown"),
                reason,
                "subscriber dropped event"
            ),
            EventKind::SubscriberPanicked => warn!(
                seq = e.seq,
                subscriber = e.subscriber.unwrap_or("unknown"),
                info = reason,
                "subscriber panicked"
            ),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
