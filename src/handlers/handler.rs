//! # Message handler abstraction.
//!
//! [`MessageHandler`] is the single delivery contract of the crate: the delivery
//! queue drives its processor through it, and routers fan messages out to
//! subscribed handlers through it.
//!
//! Handler identity is the `Arc` allocation behind a [`HandlerRef`]. Subscribing
//! the same `HandlerRef` (or a clone of it) twice is idempotent; two handlers built
//! from identical closures are distinct.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DeliveryError;
use crate::message::Message;

/// # Asynchronous delivery function.
///
/// Each invocation receives its own copy of the message. Returning an error or
/// panicking both count as one failed delivery.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use courier::{DeliveryError, Message, MessageHandler};
///
/// struct Discard;
///
/// #[async_trait]
/// impl MessageHandler for Discard {
///     fn name(&self) -> &str { "discard" }
///
///     async fn handle(&self, _message: Message) -> Result<(), DeliveryError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Human-readable name (for logs/events).
    fn name(&self) -> &str;

    /// Delivers one message.
    async fn handle(&self, message: Message) -> Result<(), DeliveryError>;
}

/// Shared reference to a handler.
pub type HandlerRef = Arc<dyn MessageHandler>;
