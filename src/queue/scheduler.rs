//! # Scheduler: the actor that owns a queue's entries.
//!
//! One scheduler task runs per [`DeliveryQueue`](crate::DeliveryQueue). It exclusively
//! owns the entry map, the scan order, the in-flight set and the join sets of running
//! attempts and failure notifications. Producers never touch that state; they send
//! [`Command`]s over an unbounded channel.
//!
//! ## Loop
//! ```text
//! loop {
//!   select! {
//!     shutdown token      ─► stop admitting, wait for in-flight attempts, exit
//!     command             ─► Enqueue / Snapshot / WhenIdle
//!     attempt completed   ─► success: remove entry
//!                            failure: attempts += 1
//!                                     ├─ attempts >= max_retries ─► remove, notify failure handler
//!                                     └─ otherwise               ─► retry_at = now + cooldown
//!     notification done   ─► (bookkeeping only)
//!     earliest retry_at   ─► (wake up)
//!   }
//!   scheduling pass: scan entries in order, start due entries until max_concurrent
//!   resolve idle waiters
//! }
//! ```
//!
//! ## Rules
//! - At most `max_concurrent` attempts are in flight; admission is the only gate.
//! - At most one attempt per id is in flight; attempts of one id are sequential.
//! - An entry in cooldown is re-checked when its `retry_at` elapses, so a lone
//!   failing entry is never stranded.
//! - The state is never locked and never held across an `.await` of a handler.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinSet};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use super::attempt::{AttemptDone, run_attempt};
use super::config::QueueConfig;
use super::entry::{EntryState, QueueSnapshot, QueuedEntry};
use crate::error::{DeliveryError, panic_info};
use crate::events::{Bus, Event, EventKind};
use crate::handlers::{FailedDelivery, FailureRef, HandlerRef};
use crate::message::Message;

/// Requests sent to the scheduler by queue handles.
pub(crate) enum Command {
    Enqueue(Message),
    Snapshot(oneshot::Sender<QueueSnapshot>),
    WhenIdle(oneshot::Sender<()>),
}

/// What woke the scheduler up.
enum Wake {
    Shutdown,
    Command(Option<Command>),
    Attempt(Result<AttemptDone, JoinError>),
    Notified,
    Timer,
}

pub(crate) struct Scheduler {
    cfg: QueueConfig,
    processor: HandlerRef,
    on_failure: FailureRef,
    bus: Bus,

    entries: HashMap<String, QueuedEntry>,
    order: BTreeMap<u64, String>,
    next_seq: u64,
    in_flight: HashSet<String>,
    attempts: JoinSet<AttemptDone>,
    notifications: JoinSet<()>,
    idle_waiters: Vec<oneshot::Sender<()>>,
    /// Published while shutting down so `shutdown` can name stuck attempts.
    stuck: watch::Sender<Vec<String>>,
    was_idle: bool,
}

impl Scheduler {
    pub fn new(
        cfg: QueueConfig,
        processor: HandlerRef,
        on_failure: FailureRef,
        bus: Bus,
        stuck: watch::Sender<Vec<String>>,
    ) -> Self {
        Self {
            cfg,
            processor,
            on_failure,
            bus,
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
            in_flight: HashSet::new(),
            attempts: JoinSet::new(),
            notifications: JoinSet::new(),
            idle_waiters: Vec::new(),
            stuck,
            was_idle: true,
        }
    }

    /// Runs until every handle is dropped and all work settled, or until `token`
    /// is cancelled and in-flight attempts settled.
    ///
    /// `done` is cancelled on a natural exit so the subscriber listener stops; on
    /// the shutdown path the queue cancels it after its final event.
    pub async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<Command>,
        token: CancellationToken,
        done: CancellationToken,
    ) {
        let mut open = true;

        loop {
            let wake = self.next_wake(&mut rx, open, &token).await;
            match wake {
                Wake::Shutdown => break,
                Wake::Command(Some(cmd)) => self.on_command(cmd),
                Wake::Command(None) => open = false,
                Wake::Attempt(res) => self.on_attempt(res),
                Wake::Notified | Wake::Timer => {}
            }

            self.schedule();
            self.resolve_idle();
            if !open && self.is_idle() {
                done.cancel();
                return;
            }
        }

        self.wind_down(rx).await;
    }

    async fn next_wake(
        &mut self,
        rx: &mut mpsc::UnboundedReceiver<Command>,
        open: bool,
        token: &CancellationToken,
    ) -> Wake {
        let deadline = self.next_deadline();
        let timer_armed = deadline.is_some();
        let sleep = time::sleep_until(deadline.unwrap_or_else(far_future));
        let attempts_running = !self.attempts.is_empty();
        let notifying = !self.notifications.is_empty();

        tokio::select! {
            biased;
            _ = token.cancelled() => Wake::Shutdown,
            Some(res) = self.attempts.join_next(), if attempts_running => Wake::Attempt(res),
            Some(_) = self.notifications.join_next(), if notifying => Wake::Notified,
            cmd = rx.recv(), if open => Wake::Command(cmd),
            _ = sleep, if timer_armed => Wake::Timer,
        }
    }

    fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::Enqueue(message) => self.enqueue(message),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::WhenIdle(reply) => self.idle_waiters.push(reply),
        }
    }

    /// Inserts or replaces the entry for `message.id` (last write wins).
    fn enqueue(&mut self, message: Message) {
        match self.entries.get_mut(&message.id) {
            Some(entry) => {
                let state = if self.in_flight.contains(&message.id) {
                    "in_flight"
                } else {
                    "queued"
                };
                self.bus
                    .publish(Event::about(EventKind::EntryReplaced, &message).with_reason(state));
                *entry = QueuedEntry::new(message, entry.seq);
            }
            None => {
                self.bus
                    .publish(Event::about(EventKind::MessageQueued, &message));
                let seq = self.next_seq;
                self.next_seq += 1;
                self.order.insert(seq, message.id.clone());
                self.entries
                    .insert(message.id.clone(), QueuedEntry::new(message, seq));
            }
        }
        self.was_idle = false;
    }

    /// Applies the outcome of a finished attempt to the entry currently stored under
    /// its id. A re-enqueue while the attempt ran means that entry holds the newer
    /// message: a stale success removes it, a stale failure counts against it.
    fn on_attempt(&mut self, res: Result<AttemptDone, JoinError>) {
        let AttemptDone { id, outcome } = match res {
            Ok(done) => done,
            Err(err) => {
                // run_attempt catches handler panics; this is a runtime-level abort.
                tracing::error!(error = %err, "delivery attempt task aborted");
                return;
            }
        };
        self.in_flight.remove(&id);

        match outcome {
            Ok(()) => {
                self.remove(&id);
            }
            Err(error) => self.on_attempt_failed(&id, error),
        }
    }

    fn on_attempt_failed(&mut self, id: &str, error: DeliveryError) {
        let now = Instant::now();
        let max_retries = self.cfg.max_retries;

        let Some(entry) = self.entries.get_mut(id) else {
            return;
        };
        entry.record_failure(now, error.clone());
        let attempts = entry.attempts;

        if attempts < max_retries {
            let delay = self.cfg.cooldown(attempts);
            entry.retry_at = Some(now.checked_add(delay).unwrap_or_else(far_future));
            self.bus.publish(
                Event::about(EventKind::RetryScheduled, &entry.message)
                    .with_attempt(attempts)
                    .with_delay(delay)
                    .with_reason(error.to_string()),
            );
            return;
        }

        let Some(entry) = self.remove(id) else {
            return;
        };
        self.bus.publish(
            Event::about(EventKind::DeliveryExhausted, &entry.message)
                .with_attempt(attempts)
                .with_reason(error.to_string()),
        );
        self.notify_failure(FailedDelivery {
            message: entry.message,
            attempts,
            error,
        });
    }

    /// Hands a permanent failure to the failure handler on its own task.
    fn notify_failure(&mut self, failure: FailedDelivery) {
        let handler = self.on_failure.clone();
        let bus = self.bus.clone();
        let id = failure.message.id.clone();

        self.notifications.spawn(async move {
            let fut = AssertUnwindSafe(handler.on_failure(failure)).catch_unwind();
            if let Err(payload) = fut.await {
                let info = panic_info(payload.as_ref());
                tracing::warn!(id = %id, handler = handler.name(), %info, "failure handler panicked");
                bus.publish(
                    Event::new(EventKind::FailureHandlerPanicked)
                        .with_message(id)
                        .with_reason(info),
                );
            }
        });
    }

    /// Scheduling pass: starts due entries in scan order until the concurrency cap.
    fn schedule(&mut self) {
        let limit = self.cfg.max_concurrent;
        if self.in_flight.len() >= limit {
            return;
        }
        let now = Instant::now();
        let room = limit - self.in_flight.len();

        let ready: Vec<String> = self
            .order
            .values()
            .filter(|id| !self.in_flight.contains(*id))
            .filter(|id| self.entries.get(*id).is_some_and(|e| e.is_due(now)))
            .take(room)
            .cloned()
            .collect();

        for id in ready {
            self.start(id);
        }
    }

    fn start(&mut self, id: String) {
        let Some(entry) = self.entries.get(&id) else {
            return;
        };
        let attempt = entry.attempts + 1;
        let message = entry.message.clone();

        self.bus
            .publish(Event::about(EventKind::AttemptStarting, &message).with_attempt(attempt));
        self.attempts.spawn(run_attempt(
            self.processor.clone(),
            message,
            attempt,
            self.cfg.attempt_timeout(),
            self.bus.clone(),
        ));
        self.in_flight.insert(id);
    }

    fn remove(&mut self, id: &str) -> Option<QueuedEntry> {
        let entry = self.entries.remove(id)?;
        self.order.remove(&entry.seq);
        Some(entry)
    }

    /// Earliest cooldown end among entries that could be started.
    fn next_deadline(&self) -> Option<Instant> {
        if self.in_flight.len() >= self.cfg.max_concurrent {
            // A completion will trigger the next pass.
            return None;
        }
        self.entries
            .values()
            .filter(|e| !self.in_flight.contains(&e.message.id))
            .filter_map(|e| e.retry_at)
            .min()
    }

    fn is_idle(&self) -> bool {
        self.entries.is_empty() && self.in_flight.is_empty() && self.notifications.is_empty()
    }

    fn resolve_idle(&mut self) {
        if !self.is_idle() {
            return;
        }
        if !self.was_idle {
            self.was_idle = true;
            self.bus.publish(Event::new(EventKind::QueueIdle));
        }
        for waiter in self.idle_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    fn snapshot(&self) -> QueueSnapshot {
        let entries = self
            .order
            .values()
            .filter_map(|id| self.entries.get(id))
            .map(|e| EntryState {
                id: e.message.id.clone(),
                attempts: e.attempts,
                in_flight: self.in_flight.contains(&e.message.id),
                last_attempt: e.last_attempt,
                last_error: e.last_error.clone(),
            })
            .collect();
        QueueSnapshot {
            entries,
            in_flight: self.in_flight.len(),
        }
    }

    /// Shutdown path: no new attempts, in-flight attempts and notifications run to
    /// completion, queued entries are dropped.
    async fn wind_down(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        rx.close();
        let _ = self.stuck.send(self.in_flight_ids());

        while let Some(res) = self.attempts.join_next().await {
            self.on_attempt(res);
            let _ = self.stuck.send(self.in_flight_ids());
        }
        while self.notifications.join_next().await.is_some() {}

        let dropped = self.entries.len();
        if dropped > 0 {
            tracing::debug!(dropped, "delivery queue stopped with entries still queued");
        }
        self.entries.clear();
        self.order.clear();

        // Anything still in the channel was sent before close(); answer it.
        while let Ok(cmd) = rx.try_recv() {
            match cmd {
                Command::Snapshot(reply) => {
                    let _ = reply.send(self.snapshot());
                }
                Command::WhenIdle(reply) => {
                    let _ = reply.send(());
                }
                Command::Enqueue(message) => {
                    tracing::debug!(id = %message.id, "enqueue after shutdown ignored");
                }
            }
        }
        self.resolve_idle();
    }

    fn in_flight_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.in_flight.iter().cloned().collect();
        ids.sort_unstable();
        ids
    }
}

fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86_400 * 365)
}
