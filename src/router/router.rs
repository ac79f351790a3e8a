//! # Router capability.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RouteError;
use crate::handlers::HandlerRef;
use crate::message::{Channel, Message};

/// # Routes messages to subscribed handlers.
///
/// Implementations are selected at construction time ([`ChannelRouter`],
/// [`CompositeRouter`]) and used through [`RouterRef`].
///
/// `subscribe` and `unsubscribe` are synchronous and never hold a lock across an
/// `.await`, so they may be called from inside a handler.
///
/// [`ChannelRouter`]: crate::ChannelRouter
/// [`CompositeRouter`]: crate::CompositeRouter
#[async_trait]
pub trait Router: Send + Sync + 'static {
    /// Delivers `message` to every handler subscribed to `message.channel`.
    async fn send(&self, message: Message) -> Result<(), RouteError>;

    /// Delivers a copy of `message` with the recipient cleared.
    async fn broadcast(&self, message: Message) -> Result<(), RouteError> {
        self.send(message.into_broadcast()).await
    }

    /// Adds `handler` to `channel`. Subscribing the same handler twice is a no-op.
    fn subscribe(&self, channel: Channel, handler: HandlerRef);

    /// Removes `handler` from `channel`. A no-op if it is not subscribed.
    fn unsubscribe(&self, channel: Channel, handler: &HandlerRef);
}

/// Shared reference to a router.
pub type RouterRef = Arc<dyn Router>;
