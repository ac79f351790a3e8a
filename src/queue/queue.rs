//! # Delivery queue: public handle over the scheduler actor.
//!
//! [`DeliveryQueue`] owns the event bus, the subscriber fan-out and the scheduler
//! task. [`QueueHandle`] is the cheap, cloneable producer side.
//!
//! ## Wiring
//! ```text
//! DeliveryQueue::builder(cfg, processor, on_failure)
//!     .with_subscribers(subs)
//!     .build()
//!        ├─► Bus::new(cfg.bus_capacity)
//!        ├─► listener: Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!        └─► scheduler: Scheduler::run(commands, token, done)
//!
//! QueueHandle::enqueue(msg) ──► Command::Enqueue ──► scheduler
//! QueueHandle::drain()      ──► Command::WhenIdle ──► resolved when idle
//!
//! DeliveryQueue::shutdown():
//!   publish(ShutdownRequested) ─► token.cancel()
//!   timeout(grace, scheduler):
//!     ├─ Ok  → publish(ShutdownComplete)
//!     └─ Err → publish(GraceExceeded) → RuntimeError::GraceExceeded { in_flight }
//! ```
//!
//! ## Rules
//! - `enqueue` never blocks and never fails; after shutdown the message is
//!   dropped with a warning.
//! - Shutdown never aborts a running attempt. On `GraceExceeded` the attempts
//!   keep running in the background until they settle.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::config::QueueConfig;
use super::entry::QueueSnapshot;
use super::scheduler::{Command, Scheduler};
use crate::error::{ConfigError, QueueError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::handlers::{FailureRef, HandlerRef};
use crate::message::Message;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for a [`DeliveryQueue`].
pub struct DeliveryQueueBuilder {
    cfg: QueueConfig,
    processor: HandlerRef,
    on_failure: FailureRef,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl DeliveryQueueBuilder {
    /// Sets event subscribers.
    ///
    /// Each subscriber gets a dedicated worker with a bounded queue; a slow
    /// subscriber loses events (reported as `SubscriberOverflow`) instead of
    /// slowing deliveries down.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Validates the configuration and starts the scheduler.
    ///
    /// Must be called within a Tokio runtime.
    pub fn build(self) -> Result<DeliveryQueue, ConfigError> {
        self.cfg.validate()?;

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let token = CancellationToken::new();
        let done = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let (stuck_tx, stuck_rx) = watch::channel(Vec::new());

        spawn_listener(
            bus.subscribe(),
            SubscriberSet::new(self.subscribers, bus.clone()),
            done.clone(),
        );

        let grace = self.cfg.grace;
        let scheduler = Scheduler::new(
            self.cfg,
            self.processor,
            self.on_failure,
            bus.clone(),
            stuck_tx,
        );
        let task = tokio::spawn(scheduler.run(rx, token.clone(), done.clone()));

        Ok(DeliveryQueue {
            handle: QueueHandle { tx },
            bus,
            grace,
            token,
            done,
            stuck: stuck_rx,
            task,
        })
    }
}

/// Forwards bus events to the subscriber set until `done`, then flushes what is
/// already buffered and stops the workers.
fn spawn_listener(
    mut rx: broadcast::Receiver<Event>,
    set: SubscriberSet,
    done: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = done.cancelled() => break,
                ev = rx.recv() => match ev {
                    Ok(ev) => set.emit(&ev),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "event listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        while let Ok(ev) = rx.try_recv() {
            set.emit(&ev);
        }
        set.shutdown().await;
    });
}

/// Cloneable producer handle of a [`DeliveryQueue`].
///
/// The scheduler keeps running while any handle (or the queue itself) is alive
/// or while work remains.
#[derive(Clone, Debug)]
pub struct QueueHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl QueueHandle {
    /// Adds `message` for delivery, replacing any entry with the same id.
    ///
    /// Returns immediately; the first attempt starts as soon as a concurrency
    /// slot is free.
    pub fn enqueue(&self, message: Message) {
        if let Err(mpsc::error::SendError(Command::Enqueue(message))) =
            self.tx.send(Command::Enqueue(message))
        {
            tracing::warn!(id = %message.id, "delivery queue closed; message dropped");
        }
    }

    /// Returns a point-in-time view of the queued entries.
    pub async fn snapshot(&self) -> Result<QueueSnapshot, QueueError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot(reply))
            .map_err(|_| QueueError::Closed)?;
        rx.await.map_err(|_| QueueError::Closed)
    }

    /// Resolves once no entry is queued, no attempt is in flight and every
    /// failure notification has completed.
    ///
    /// Messages enqueued while waiting are waited for too.
    pub async fn drain(&self) -> Result<(), QueueError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::WhenIdle(reply))
            .map_err(|_| QueueError::Closed)?;
        rx.await.map_err(|_| QueueError::Closed)
    }

    /// True if the scheduler has stopped accepting commands.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Retrying delivery queue with bounded concurrency.
///
/// Every enqueued message is handed to the processor until it succeeds or until
/// it has been attempted `max_retries` times, after which the failure handler is
/// notified exactly once. Attempts of one message are sequential and separated by
/// at least `retry_delay`; at most `max_concurrent` attempts run at once.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use courier::{
///     Channel, DeliveryError, DeliveryQueue, FailedDelivery, FailureFn, HandlerFn,
///     Message, QueueConfig,
/// };
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let cfg = QueueConfig {
///         retry_delay: Duration::from_millis(10),
///         ..QueueConfig::default()
///     };
///     let processor = HandlerFn::arc("print", |m: Message| async move {
///         println!("deliver {} on {}", m.id, m.channel);
///         Ok::<_, DeliveryError>(())
///     });
///     let on_failure = FailureFn::arc("dead-letter", |_f: FailedDelivery| async {});
///
///     let queue = DeliveryQueue::builder(cfg, processor, on_failure).build()?;
///     queue.enqueue(Message::new("m-1", "bot", Channel::Slack, "hello"));
///     queue.drain().await?;
///     queue.shutdown().await?;
///     Ok(())
/// }
/// ```
pub struct DeliveryQueue {
    handle: QueueHandle,
    bus: Bus,
    grace: std::time::Duration,
    token: CancellationToken,
    done: CancellationToken,
    stuck: watch::Receiver<Vec<String>>,
    task: JoinHandle<()>,
}

impl DeliveryQueue {
    /// Starts building a queue around `processor` and `on_failure`.
    pub fn builder(
        cfg: QueueConfig,
        processor: HandlerRef,
        on_failure: FailureRef,
    ) -> DeliveryQueueBuilder {
        DeliveryQueueBuilder {
            cfg,
            processor,
            on_failure,
            subscribers: Vec::new(),
        }
    }

    /// Returns a cloneable producer handle.
    pub fn handle(&self) -> QueueHandle {
        self.handle.clone()
    }

    /// See [`QueueHandle::enqueue`].
    pub fn enqueue(&self, message: Message) {
        self.handle.enqueue(message);
    }

    /// See [`QueueHandle::snapshot`].
    pub async fn snapshot(&self) -> Result<QueueSnapshot, QueueError> {
        self.handle.snapshot().await
    }

    /// See [`QueueHandle::drain`].
    pub async fn drain(&self) -> Result<(), QueueError> {
        self.handle.drain().await
    }

    /// Subscribes to the raw event stream.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Stops the queue.
    ///
    /// No new attempt starts once this is called. In-flight attempts are awaited
    /// for up to the configured grace period; entries still waiting are dropped
    /// without a failure notification.
    pub async fn shutdown(self) -> Result<(), RuntimeError> {
        let DeliveryQueue {
            handle,
            bus,
            grace,
            token,
            done,
            stuck,
            task,
        } = self;
        drop(handle);

        bus.publish(Event::new(EventKind::ShutdownRequested));
        token.cancel();

        let res = match tokio::time::timeout(grace, task).await {
            Ok(joined) => {
                if let Err(err) = joined {
                    tracing::error!(error = %err, "delivery queue scheduler aborted");
                }
                bus.publish(Event::new(EventKind::ShutdownComplete));
                Ok(())
            }
            Err(_elapsed) => {
                let in_flight = stuck.borrow().clone();
                bus.publish(
                    Event::new(EventKind::GraceExceeded).with_reason(in_flight.join(",")),
                );
                Err(RuntimeError::GraceExceeded { grace, in_flight })
            }
        };
        done.cancel();
        res
    }
}
