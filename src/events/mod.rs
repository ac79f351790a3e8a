//! Queue events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the delivery queue scheduler, its
//! attempt tasks and the subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `queue::scheduler`, `queue::attempt`, `SubscriberSet` workers
//!   (overflow/panic).
//! - **Consumers**: the queue's subscriber listener (fans out to `SubscriberSet`) and
//!   any receiver obtained from `DeliveryQueue::subscribe_events`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
