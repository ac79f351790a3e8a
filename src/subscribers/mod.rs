//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and,
//! behind the `logging` feature, the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Scheduler / attempts ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit
//!                                                                     │
//!                                                       ┌─────────────┼─────────────┐
//!                                                       ▼             ▼             ▼
//!                                                   LogWriter      Metrics        Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use courier::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct DeadLetterCounter;
//!
//! #[async_trait]
//! impl Subscribe for DeadLetterCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::DeliveryExhausted {
//!             // increment counter
//!         }
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
