//! # Composite router: one delegate per channel.
//!
//! ```text
//! send(msg) ──► delegates[msg.channel] ──┬─ Some(router) ─► router.send(msg)
//!                                        └─ None ─► Err(NoRouter)   (nothing invoked)
//!
//! subscribe(c, h) ──► delegates[c] ──┬─ Some(router) ─► router.subscribe(c, h)
//!                                    └─ None ─► ignored
//! ```
//!
//! `send` reports a missing delegate while `subscribe` ignores it; a handler
//! subscribed before its channel's router is registered is lost.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::router::{Router, RouterRef};
use crate::error::RouteError;
use crate::handlers::HandlerRef;
use crate::message::{Channel, Message};

/// Router of routers keyed by channel.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use courier::{Channel, ChannelRouter, CompositeRouter, Message, Router, RouteError};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let router = CompositeRouter::new();
///     router.register_router(Channel::Slack, Arc::new(ChannelRouter::slack()));
///
///     let ok = Message::new("m-1", "bot", Channel::Slack, "deploy done");
///     assert!(router.send(ok).await.is_ok());
///
///     let lost = Message::new("m-2", "bot", Channel::Email, "deploy done");
///     assert_eq!(
///         router.send(lost).await,
///         Err(RouteError::NoRouter { channel: Channel::Email })
///     );
/// }
/// ```
#[derive(Default)]
pub struct CompositeRouter {
    delegates: RwLock<HashMap<Channel, RouterRef>>,
}

impl CompositeRouter {
    /// Creates a composite router with no delegates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `router` the delegate for `channel`, returning the one it replaces.
    pub fn register_router(&self, channel: Channel, router: RouterRef) -> Option<RouterRef> {
        let prev = self.delegates.write().insert(channel, router);
        if prev.is_some() {
            tracing::debug!(%channel, "router replaced");
        }
        prev
    }

    /// Channels that currently have a delegate, in [`Channel`] order.
    pub fn channels(&self) -> Vec<Channel> {
        let mut channels: Vec<Channel> = self.delegates.read().keys().copied().collect();
        channels.sort_unstable();
        channels
    }

    fn delegate(&self, channel: Channel) -> Option<RouterRef> {
        self.delegates.read().get(&channel).cloned()
    }
}

#[async_trait]
impl Router for CompositeRouter {
    async fn send(&self, message: Message) -> Result<(), RouteError> {
        let channel = message.channel;
        let router = self.delegate(channel).ok_or(RouteError::NoRouter { channel })?;
        router.send(message).await
    }

    async fn broadcast(&self, message: Message) -> Result<(), RouteError> {
        let channel = message.channel;
        let router = self.delegate(channel).ok_or(RouteError::NoRouter { channel })?;
        router.broadcast(message).await
    }

    fn subscribe(&self, channel: Channel, handler: HandlerRef) {
        match self.delegate(channel) {
            Some(router) => router.subscribe(channel, handler),
            None => {
                tracing::debug!(%channel, handler = handler.name(), "no router; subscription ignored");
            }
        }
    }

    fn unsubscribe(&self, channel: Channel, handler: &HandlerRef) {
        if let Some(router) = self.delegate(channel) {
            router.unsubscribe(channel, handler);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::ChannelRouter;
    use crate::error::DeliveryError;
    use crate::handlers::HandlerFn;

    fn counter(calls: &Arc<AtomicUsize>) -> HandlerRef {
        let calls = Arc::clone(calls);
        HandlerFn::arc("count", move |_m: Message| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, DeliveryError>(())
            }
        })
    }

    fn composite() -> CompositeRouter {
        let router = CompositeRouter::new();
        router.register_router(Channel::Slack, Arc::new(ChannelRouter::slack()));
        router.register_router(Channel::Internal, Arc::new(ChannelRouter::internal()));
        router
    }

    #[tokio::test]
    async fn delegates_by_channel() {
        let calls = Arc::new(AtomicUsize::new(0));
        let router = composite();
        router.subscribe(Channel::Slack, counter(&calls));

        router
            .send(Message::new("m-1", "sys", Channel::Slack, "x"))
            .await
            .unwrap();
        router
            .send(Message::new("m-2", "sys", Channel::Internal, "x"))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(router.channels(), vec![Channel::Slack, Channel::Internal]);
    }

    #[tokio::test]
    async fn unregistered_channel_fails_and_invokes_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let router = composite();
        router.subscribe(Channel::Slack, counter(&calls));
        router.subscribe(Channel::Internal, counter(&calls));

        let msg = Message::new("m-1", "sys", Channel::Email, "x");
        let err = router.send(msg.clone()).await.unwrap_err();
        assert_eq!(err, RouteError::NoRouter { channel: Channel::Email });

        let err = router.broadcast(msg).await.unwrap_err();
        assert_eq!(err.as_label(), "route_no_router");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn subscribe_before_register_is_dropped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let router = CompositeRouter::new();
        router.subscribe(Channel::Email, counter(&calls));
        router.register_router(Channel::Email, Arc::new(ChannelRouter::email()));

        router
            .send(Message::new("m-1", "sys", Channel::Email, "x"))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unsubscribe_is_forwarded() {
        let calls = Arc::new(AtomicUsize::new(0));
        let router = composite();
        let h = counter(&calls);
        router.subscribe(Channel::Slack, h.clone());
        router.unsubscribe(Channel::Slack, &h);
        router.unsubscribe(Channel::Email, &h);

        router
            .send(Message::new("m-1", "sys", Channel::Slack, "x"))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn register_replaces_previous_delegate() {
        let calls = Arc::new(AtomicUsize::new(0));
        let router = composite();
        router.subscribe(Channel::Slack, counter(&calls));

        let prev = router.register_router(Channel::Slack, Arc::new(ChannelRouter::slack()));
        assert!(prev.is_some());

        // The new delegate starts without subscribers.
        router
            .send(Message::new("m-1", "sys", Channel::Slack, "x"))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn broadcast_goes_through_the_delegate() {
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let sink = Arc::clone(&seen);
        let h: HandlerRef = HandlerFn::arc("capture", move |m: Message| {
            let sink = Arc::clone(&sink);
            async move {
                *sink.lock() = Some(m);
                Ok::<_, DeliveryError>(())
            }
        });
        let router = composite();
        router.subscribe(Channel::Internal, h);

        let msg = Message::new("m-1", "sys", Channel::Internal, "x").with_to("ops");
        router.broadcast(msg).await.unwrap();
        assert_eq!(seen.lock().as_ref().and_then(|m| m.to.clone()), None);
        assert!(seen.lock().is_some());
    }
}
