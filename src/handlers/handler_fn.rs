//! # Function-backed handler (`HandlerFn`)
//!
//! [`HandlerFn`] wraps a closure `F: Fn(Message) -> Fut`, producing a fresh future
//! per invocation. No state is shared between invocations unless the closure
//! captures an `Arc<...>` explicitly.
//!
//! ## Example
//! ```rust
//! use courier::{DeliveryError, HandlerFn, HandlerRef, Message};
//!
//! let h: HandlerRef = HandlerFn::arc("printer", |msg: Message| async move {
//!     println!("{}: {}", msg.channel, msg.content);
//!     Ok::<_, DeliveryError>(())
//! });
//!
//! assert_eq!(h.name(), "printer");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DeliveryError;
use crate::handlers::MessageHandler;
use crate::message::Message;

/// Function-backed handler implementation.
pub struct HandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a
    /// [`HandlerRef`](crate::HandlerRef).
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
impl<F, Fut> MessageHandler for HandlerFn<F>
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), DeliveryError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, message: Message) -> Result<(), DeliveryError> {
        (self.f)(message).await
    }
}

impl<F> std::fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerFn").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::message::Channel;
    use crate::HandlerRef;

    #[tokio::test]
    async fn each_invocation_gets_its_own_message() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let h: HandlerRef = HandlerFn::arc("count", move |msg: Message| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(msg.content.len(), Ordering::SeqCst);
                Ok::<_, DeliveryError>(())
            }
        });

        h.handle(Message::new("1", "sys", Channel::Internal, "ab"))
            .await
            .unwrap();
        h.handle(Message::new("2", "sys", Channel::Internal, "cde"))
            .await
            .unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn errors_are_returned_unchanged() {
        let h = HandlerFn::new("nope", |_msg: Message| async {
            Err::<(), _>(DeliveryError::fail("nope"))
        });
        let err = h
            .handle(Message::new("1", "sys", Channel::Slack, "x"))
            .await
            .unwrap_err();
        assert_eq!(err, DeliveryError::fail("nope"));
    }
}
