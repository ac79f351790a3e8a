//! # Permanent failure notification.
//!
//! The delivery queue hands every message that exhausted its attempts to exactly
//! one [`FailureHandler`], once. The notification runs on its own task; a panic
//! inside it is caught and reported as
//! [`EventKind::FailureHandlerPanicked`](crate::EventKind::FailureHandlerPanicked).

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DeliveryError;
use crate::message::Message;

/// Terminal record of a message the queue gave up on.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedDelivery {
    /// The message as last enqueued under its id.
    pub message: Message,
    /// Attempts made (equals the configured `max_retries`).
    pub attempts: u32,
    /// Error of the final attempt.
    pub error: DeliveryError,
}

/// Receiver of permanent delivery failures.
#[async_trait]
pub trait FailureHandler: Send + Sync + 'static {
    /// Called once per permanently failed message.
    async fn on_failure(&self, failure: FailedDelivery);

    /// Human-readable name (for logs/events).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Shared reference to a failure handler.
pub type FailureRef = Arc<dyn FailureHandler>;

/// Closure-backed [`FailureHandler`].
///
/// ```rust
/// use courier::{FailedDelivery, FailureFn, FailureRef};
///
/// let on_failure: FailureRef = FailureFn::arc("dead-letter", |f: FailedDelivery| async move {
///     eprintln!("giving up on {} after {} attempts: {}", f.message.id, f.attempts, f.error);
/// });
/// assert_eq!(on_failure.name(), "dead-letter");
/// ```
pub struct FailureFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> FailureFn<F> {
    /// Creates a new closure-backed failure handler.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> FailureHandler for FailureFn<F>
where
    F: Fn(FailedDelivery) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn on_failure(&self, failure: FailedDelivery) {
        (self.f)(failure).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
