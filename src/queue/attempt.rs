//! # Run a single delivery attempt.
//!
//! Executes one attempt of the processor with an optional timeout, catching panics,
//! and publishes the attempt's outcome to the [`Bus`].
//!
//! ## Event flow
//! ```text
//! Success:
//!   processor.handle() → Ok(())  → publish AttemptSucceeded
//!
//! Failure / panic:
//!   processor.handle() → Err / ⚡ → publish AttemptFailed
//!
//! Timeout:
//!   timeout exceeded → drop attempt future → publish TimeoutHit
//!                                          → publish AttemptFailed (timeout)
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** terminal event: `AttemptSucceeded` or `AttemptFailed`
//! - Panics never escape, including panics raised while the handler builds its
//!   future; they become [`DeliveryError::Panicked`]
//! - A timeout drops the attempt future, cancelling the handler mid-flight
//! - Retry decisions are **not** made here; the scheduler owns entry state

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::time;

use crate::error::{DeliveryError, panic_info};
use crate::events::{Bus, Event, EventKind};
use crate::handlers::HandlerRef;
use crate::message::Message;

/// Outcome of one attempt, reported back to the scheduler.
pub(crate) struct AttemptDone {
    pub id: String,
    pub outcome: Result<(), DeliveryError>,
}

/// Executes one attempt of `processor` on `message`.
///
/// `attempt` is the 1-based attempt number, used for events only.
pub(crate) async fn run_attempt(
    processor: HandlerRef,
    message: Message,
    attempt: u32,
    timeout: Option<Duration>,
    bus: Bus,
) -> AttemptDone {
    let id = message.id.clone();
    let channel = message.channel;
    let event = |kind| {
        Event::new(kind)
            .with_message(id.as_str())
            .with_channel(channel)
            .with_attempt(attempt)
    };
    // The call itself runs inside the guarded future: a handler may panic before
    // returning its future.
    let fut = AssertUnwindSafe(async move { processor.handle(message).await }).catch_unwind();

    let outcome = match timeout {
        Some(dur) => match time::timeout(dur, fut).await {
            Ok(res) => settle(res),
            Err(_elapsed) => {
                bus.publish(event(EventKind::TimeoutHit).with_timeout(dur));
                Err(DeliveryError::Timeout { timeout: dur })
            }
        },
        None => settle(fut.await),
    };

    match &outcome {
        Ok(()) => bus.publish(event(EventKind::AttemptSucceeded)),
        Err(e) => bus.publish(event(EventKind::AttemptFailed).with_reason(e.to_string())),
    }
    AttemptDone { id, outcome }
}

fn settle(res: Result<Result<(), DeliveryError>, Box<dyn Any + Send>>) -> Result<(), DeliveryError> {
    match res {
        Ok(inner) => inner,
        Err(payload) => Err(DeliveryError::Panicked {
            info: panic_info(payload.as_ref()),
        }),
    }
}
