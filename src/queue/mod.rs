//! # Delivery queue.
//!
//! A retrying, bounded-concurrency queue that hands each message to a processor
//! ([`MessageHandler`](crate::MessageHandler)) until it succeeds or runs out of
//! attempts.
//!
//! ## Contents
//! - [`DeliveryQueue`], [`DeliveryQueueBuilder`] owner of the scheduler and its event bus
//! - [`QueueHandle`] cloneable producer side (`enqueue`, `snapshot`, `drain`)
//! - [`QueueConfig`] retry and concurrency settings
//! - [`QueueSnapshot`], [`EntryState`] read-only views of the queued entries
//!
//! ## Entry lifecycle
//! ```text
//! enqueue ─► queued ─► in flight ─┬─ Ok ─────────────────────────► removed
//!              ▲                  └─ Err ─┬─ attempts < max ─► cooldown ─┐
//!              │                          └─ attempts = max ─► removed + on_failure
//!              └──────────────────────────────────────────────────────────┘
//! ```

mod attempt;
mod config;
mod entry;
#[allow(clippy::module_inception)]
mod queue;
mod scheduler;

pub use config::QueueConfig;
pub use entry::{EntryState, QueueSnapshot};
pub use queue::{DeliveryQueue, DeliveryQueueBuilder, QueueHandle};
