//! # courier
//!
//! **Courier** is the in-process message delivery layer of a multi-channel
//! messaging application (Slack, email, internal notifications).
//!
//! It provides a retrying delivery queue with bounded concurrency, channel-aware
//! routers that fan messages out to subscribed handlers, and a composite router
//! that picks one router per channel. Concrete transports are plugged in as
//! [`MessageHandler`]s.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   producers ── enqueue(Message) ──┐
//!                                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  DeliveryQueue                                                    │
//! │  - Scheduler actor (entries, scan order, in-flight set, timers)   │
//! │  - Bus (broadcast events)                                         │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! └──────┬──────────────────┬──────────────────┬──────────────┬───────┘
//!        ▼                  ▼                  ▼              │
//!   ┌──────────┐       ┌──────────┐       ┌──────────┐        │ permanent
//!   │ attempt  │       │ attempt  │       │ attempt  │        │ failures
//!   │ (task)   │       │ (task)   │       │ (task)   │        ▼
//!   └────┬─────┘       └────┬─────┘       └────┬─────┘   FailureHandler
//!        └──────────────────┼──────────────────┘
//!                           ▼  processor: MessageHandler
//!                    RouteHandler (optional)
//!                           ▼
//!                    CompositeRouter
//!           ┌───────────────┼───────────────┐
//!           ▼               ▼               ▼
//!    ChannelRouter   ChannelRouter   ChannelRouter
//!       (slack)         (email)        (internal)
//!           │               │               │
//!     subscribed handlers (run concurrently, all settle)
//! ```
//!
//! ### Entry lifecycle
//! ```text
//! enqueue(msg) ──► Scheduler
//!
//! scheduling pass (after enqueue, completion, cooldown expiry) {
//!   for entry in scan order:
//!     ├─ in flight or cooling down ─► skip
//!     ├─ in_flight == max_concurrent ─► stop
//!     └─ publish AttemptStarting, spawn attempt
//! }
//!
//! attempt completed:
//!   ├─ Ok  ──► publish AttemptSucceeded, remove entry
//!   └─ Err ──► publish AttemptFailed, attempts += 1
//!              ├─ attempts < max_retries ─► publish RetryScheduled{ delay }
//!              │                            retry_at = now + delay
//!              └─ attempts = max_retries ─► publish DeliveryExhausted
//!                                           remove entry, FailureHandler::on_failure
//! ```
//!
//! ## Features
//! | Area              | Description                                                       | Key types / traits                              |
//! |-------------------|-------------------------------------------------------------------|-------------------------------------------------|
//! | **Queue**         | Retry with cooldown, bounded concurrency, drain and shutdown.     | [`DeliveryQueue`], [`QueueHandle`]              |
//! | **Routing**       | Per-channel fan-out, router-of-routers, router as processor.      | [`Router`], [`ChannelRouter`], [`CompositeRouter`], [`RouteHandler`] |
//! | **Handlers**      | Delivery and permanent-failure callbacks, closure-backed.         | [`MessageHandler`], [`HandlerFn`], [`FailureHandler`], [`FailureFn`] |
//! | **Subscriber API**| Hook into queue events (logging, metrics, custom subscribers).    | [`Subscribe`], [`Event`]                        |
//! | **Policies**      | Cooldown growth and jitter.                                       | [`RetryPolicy`], [`JitterPolicy`]               |
//! | **Errors**        | Typed errors for attempts, routing, configuration and shutdown.   | [`DeliveryError`], [`RouteError`], [`ConfigError`] |
//! | **Configuration** | Queue settings with validated defaults.                           | [`QueueConfig`]                                 |
//!
//! ## Optional features
//! - `logging`: exports the built-in [`LogWriter`] subscriber, which renders queue
//!   events as `tracing` records.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use courier::{
//!     Channel, ChannelRouter, CompositeRouter, DeliveryError, DeliveryQueue, FailedDelivery,
//!     FailureFn, HandlerFn, HandlerRef, Message, QueueConfig, RouteHandler, Router,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Routing: one router per channel.
//!     let router = Arc::new(CompositeRouter::new());
//!     router.register_router(Channel::Slack, Arc::new(ChannelRouter::slack()));
//!
//!     let post: HandlerRef = HandlerFn::arc("slack-post", |m: Message| async move {
//!         println!("#general <- {}", m.content);
//!         Ok::<_, DeliveryError>(())
//!     });
//!     router.subscribe(Channel::Slack, post);
//!
//!     // Delivery: retry failed fan-outs.
//!     let cfg = QueueConfig {
//!         retry_delay: Duration::from_millis(50),
//!         ..QueueConfig::default()
//!     };
//!     let processor = Arc::new(RouteHandler::new("outbound", router));
//!     let on_failure = FailureFn::arc("dead-letter", |f: FailedDelivery| async move {
//!         eprintln!("gave up on {}: {}", f.message.id, f.error);
//!     });
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn courier::Subscribe>> = vec![Arc::new(courier::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn courier::Subscribe>> = Vec::new();
//!
//!     let queue = DeliveryQueue::builder(cfg, processor, on_failure)
//!         .with_subscribers(subs)
//!         .build()?;
//!
//!     queue.enqueue(Message::new("deploy-42", "ci", Channel::Slack, "deploy finished"));
//!     queue.drain().await?;
//!     queue.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod error;
mod events;
mod handlers;
mod message;
mod policies;
mod queue;
mod router;
mod subscribers;

// ---- Public re-exports ----

pub use error::{ConfigError, DeliveryError, QueueError, RouteError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use handlers::{
    FailedDelivery, FailureFn, FailureHandler, FailureRef, HandlerFn, HandlerRef, MessageHandler,
};
pub use message::{Attachment, Channel, Message, MessageMetadata, Priority};
pub use policies::{JitterPolicy, RetryPolicy};
pub use queue::{
    DeliveryQueue, DeliveryQueueBuilder, EntryState, QueueConfig, QueueHandle, QueueSnapshot,
};
pub use router::{ChannelRouter, CompositeRouter, RouteHandler, Router, RouterRef};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose the built-in tracing subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
