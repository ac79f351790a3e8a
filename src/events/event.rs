//! # Events emitted by the delivery queue.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Entry events**: enqueue bookkeeping (queued, replaced)
//! - **Attempt events**: one processing attempt (starting, succeeded, failed, timeout,
//!   retry scheduled, exhausted)
//! - **Runtime events**: scheduler and subscriber state (idle, shutdown, overflow, panic)
//!
//! The [`Event`] struct carries the message id, channel, attempt number, delays and
//! reasons, depending on the kind.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use courier::{Channel, Event, EventKind};
//!
//! let ev = Event::new(EventKind::RetryScheduled)
//!     .with_message("m-1")
//!     .with_channel(Channel::Email)
//!     .with_attempt(2)
//!     .with_delay(Duration::from_millis(250))
//!     .with_reason("smtp 451");
//!
//! assert_eq!(ev.message.as_deref(), Some("m-1"));
//! assert_eq!(ev.delay_ms, Some(250));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::message::{Channel, Message};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of queue events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets `subscriber` (name) and `reason` (panic info).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets `subscriber` (name) and `reason` ("full" / "closed").
    SubscriberOverflow,

    // === Entry events ===
    /// A new entry was created for a message id.
    ///
    /// Sets `message`, `channel`.
    MessageQueued,

    /// An existing entry was overwritten by a re-enqueue (last write wins).
    ///
    /// Sets `message`, `channel`, `reason` ("queued" or "in_flight").
    EntryReplaced,

    // === Attempt events ===
    /// An attempt is starting.
    ///
    /// Sets `message`, `channel`, `attempt` (1-based).
    AttemptStarting,

    /// The processor accepted the message; the entry is removed.
    ///
    /// Sets `message`, `channel`, `attempt`.
    AttemptSucceeded,

    /// The processor failed for this attempt.
    ///
    /// Sets `message`, `channel`, `attempt`, `reason`.
    AttemptFailed,

    /// The attempt exceeded the per-attempt timeout (followed by `AttemptFailed`).
    ///
    /// Sets `message`, `channel`, `attempt`, `timeout_ms`.
    TimeoutHit,

    /// The entry stays queued; the next attempt waits for the cooldown.
    ///
    /// Sets `message`, `channel`, `attempt` (attempts so far), `delay_ms`, `reason`.
    RetryScheduled,

    /// Attempts exhausted; the entry is removed and the failure handler notified.
    ///
    /// Sets `message`, `channel`, `attempt`, `reason`.
    DeliveryExhausted,

    /// The failure handler panicked while being notified.
    ///
    /// Sets `message`, `reason`.
    FailureHandlerPanicked,

    // === Runtime events ===
    /// No entries remain and nothing is in flight.
    QueueIdle,

    /// Shutdown requested; no new attempts will start.
    ShutdownRequested,

    /// Every in-flight attempt settled within the grace period.
    ShutdownComplete,

    /// Grace period exceeded; some attempts were still running.
    GraceExceeded,
}

/// Queue event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Id of the message concerned.
    pub message: Option<Arc<str>>,
    /// Channel of the message concerned.
    pub channel: Option<Channel>,
    /// Attempt number (starting from 1).
    pub attempt: Option<u32>,
    /// Cooldown before the next attempt in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Attempt timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Name of the subscriber, for subscriber events.
    pub subscriber: Option<&'static str>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            message: None,
            channel: None,
            attempt: None,
            delay_ms: None,
            timeout_ms: None,
            subscriber: None,
            reason: None,
        }
    }

    /// Creates an event about `msg` (sets id and channel).
    #[inline]
    pub fn about(kind: EventKind, msg: &Message) -> Self {
        Event::new(kind)
            .with_message(msg.id.as_str())
            .with_channel(msg.channel)
    }

    /// Attaches a message id.
    #[inline]
    pub fn with_message(mut self, id: impl Into<Arc<str>>) -> Self {
        self.message = Some(id.into());
        self
    }

    /// Attaches a channel.
    #[inline]
    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a cooldown delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow).with_reason(reason);
        ev.subscriber = Some(subscriber);
        ev
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.subscriber = Some(subscriber);
        ev
    }

    /// True for attempt-level failures and exhaustion.
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(
            self.kind,
            EventKind::AttemptFailed | EventKind::TimeoutHit | EventKind::DeliveryExhausted
        )
    }
}

fn compact_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}
