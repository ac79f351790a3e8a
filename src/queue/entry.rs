//! Per-message attempt bookkeeping.

use tokio::time::Instant;

use crate::error::DeliveryError;
use crate::message::Message;

/// A queued message plus its attempt state. Owned by the scheduler.
#[derive(Debug, Clone)]
pub(crate) struct QueuedEntry {
    pub message: Message,
    /// Position in the scan order; kept across replacements.
    pub seq: u64,
    pub attempts: u32,
    pub last_attempt: Option<Instant>,
    pub last_error: Option<DeliveryError>,
    /// Earliest instant the next attempt may start.
    pub retry_at: Option<Instant>,
}

impl QueuedEntry {
    pub fn new(message: Message, seq: u64) -> Self {
        Self {
            message,
            seq,
            attempts: 0,
            last_attempt: None,
            last_error: None,
            retry_at: None,
        }
    }

    /// True if the cooldown (if any) has elapsed at `now`.
    #[inline]
    pub fn is_due(&self, now: Instant) -> bool {
        self.retry_at.is_none_or(|at| at <= now)
    }

    /// Records a failed attempt.
    pub fn record_failure(&mut self, now: Instant, error: DeliveryError) {
        self.attempts += 1;
        self.last_attempt = Some(now);
        self.last_error = Some(error);
    }
}

/// Point-in-time view of one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryState {
    /// Message id.
    pub id: String,
    /// Failed attempts so far.
    pub attempts: u32,
    /// True while an attempt for this id is running.
    pub in_flight: bool,
    /// When the most recent failed attempt completed.
    pub last_attempt: Option<Instant>,
    /// Error of the most recent failed attempt.
    pub last_error: Option<DeliveryError>,
}

/// Point-in-time view of a queue, entries in scan order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueSnapshot {
    pub entries: Vec<EntryState>,
    pub in_flight: usize,
}

impl QueueSnapshot {
    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up an entry by message id.
    pub fn get(&self, id: &str) -> Option<&EntryState> {
        self.entries.iter().find(|e| e.id == id)
    }
}
