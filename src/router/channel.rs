//! # Channel router: fan-out to subscribed handlers.
//!
//! ## Send path
//! ```text
//! send(msg)
//!   ├─ restricted to C and msg.channel != C ─► Err(ChannelMismatch)   (nothing invoked)
//!   └─ snapshot handlers of msg.channel
//!        ├─ none ─► Ok(())
//!        └─ h1.handle(msg) │ h2.handle(msg) │ ... (concurrent, panics caught)
//!             └─ all settled ─┬─ all Ok ─► Ok(())
//!                             └─ any Err ─► Err(HandlersFailed { failed, total, first })
//! ```
//!
//! ## Rules
//! - Every handler runs even when another one fails.
//! - A handler subscribed or unsubscribed during a send does not affect that send.

use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::join_all;

use super::router::Router;
use super::table::SubscriptionTable;
use crate::error::{DeliveryError, RouteError, panic_info};
use crate::handlers::HandlerRef;
use crate::message::{Channel, Message};

/// Router backed by a subscription table, optionally restricted to one channel.
///
/// # Example
/// ```rust
/// use courier::{Channel, ChannelRouter, DeliveryError, HandlerFn, HandlerRef, Message, Router};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let router = ChannelRouter::slack();
///     let echo: HandlerRef = HandlerFn::arc("echo", |m: Message| async move {
///         println!("{}: {}", m.from, m.content);
///         Ok::<_, DeliveryError>(())
///     });
///     router.subscribe(Channel::Slack, echo);
///
///     let msg = Message::new("m-1", "alice", Channel::Slack, "hi");
///     assert!(router.send(msg).await.is_ok());
///
///     let wrong = Message::new("m-2", "alice", Channel::Email, "hi");
///     assert!(router.send(wrong).await.is_err());
/// }
/// ```
#[derive(Default)]
pub struct ChannelRouter {
    only: Option<Channel>,
    table: SubscriptionTable,
}

impl ChannelRouter {
    /// Router accepting messages on any channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Router accepting only messages on `channel`.
    pub fn only(channel: Channel) -> Self {
        Self {
            only: Some(channel),
            table: SubscriptionTable::default(),
        }
    }

    /// Router restricted to [`Channel::Slack`].
    pub fn slack() -> Self {
        Self::only(Channel::Slack)
    }

    /// Router restricted to [`Channel::Email`].
    pub fn email() -> Self {
        Self::only(Channel::Email)
    }

    /// Router restricted to [`Channel::Internal`].
    pub fn internal() -> Self {
        Self::only(Channel::Internal)
    }

    /// The channel this router is restricted to, if any.
    pub fn restricted_to(&self) -> Option<Channel> {
        self.only
    }

    fn check(&self, actual: Channel) -> Result<(), RouteError> {
        match self.only {
            Some(expected) if expected != actual => {
                Err(RouteError::ChannelMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Router for ChannelRouter {
    async fn send(&self, message: Message) -> Result<(), RouteError> {
        self.check(message.channel)?;

        let channel = message.channel;
        let handlers = self.table.snapshot(channel);
        if handlers.is_empty() {
            return Ok(());
        }

        let total = handlers.len();
        let results = join_all(handlers.iter().map(|h| invoke(h, message.clone()))).await;

        let mut failed = 0;
        let mut first = None;
        for (handler, res) in handlers.iter().zip(results) {
            if let Err(err) = res {
                tracing::warn!(
                    id = %message.id,
                    %channel,
                    handler = handler.name(),
                    error = %err,
                    "message handler failed"
                );
                failed += 1;
                first.get_or_insert(err);
            }
        }

        match first {
            None => Ok(()),
            Some(first) => Err(RouteError::HandlersFailed {
                channel,
                failed,
                total,
                first: Box::new(first),
            }),
        }
    }

    fn subscribe(&self, channel: Channel, handler: HandlerRef) {
        if let Err(err) = self.check(channel) {
            tracing::debug!(error = %err, handler = handler.name(), "subscription can never match");
        }
        self.table.insert(channel, handler);
    }

    fn unsubscribe(&self, channel: Channel, handler: &HandlerRef) {
        self.table.remove(channel, handler);
    }
}

/// Runs one handler, turning a panic into a failure.
async fn invoke(handler: &HandlerRef, message: Message) -> Result<(), DeliveryError> {
    match AssertUnwindSafe(handler.handle(message)).catch_unwind().await {
        Ok(res) => res,
        Err(payload) => Err(DeliveryError::Panicked {
            info: panic_info(payload.as_ref()),
        }),
    }
}
