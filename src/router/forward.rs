//! Router as a delivery-queue processor.

use std::borrow::Cow;

use async_trait::async_trait;

use super::router::RouterRef;
use crate::error::DeliveryError;
use crate::handlers::MessageHandler;
use crate::message::Message;

/// [`MessageHandler`] that publishes each message through a router.
///
/// Any [`RouteError`](crate::RouteError) becomes [`DeliveryError::Route`], so a
/// queue using this as its processor retries failed fan-outs.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use courier::{
///     Channel, ChannelRouter, DeliveryQueue, FailedDelivery, FailureFn, QueueConfig,
///     RouteHandler,
/// };
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let slack = Arc::new(ChannelRouter::slack());
///     let processor = Arc::new(RouteHandler::new("slack-out", slack));
///     let on_failure = FailureFn::arc("dead-letter", |_f: FailedDelivery| async {});
///
///     let queue = DeliveryQueue::builder(QueueConfig::default(), processor, on_failure).build()?;
///     queue.shutdown().await?;
///     Ok(())
/// }
/// ```
pub struct RouteHandler {
    name: Cow<'static, str>,
    router: RouterRef,
    broadcast: bool,
}

impl RouteHandler {
    /// Handler that calls `router.send`.
    pub fn new(name: impl Into<Cow<'static, str>>, router: RouterRef) -> Self {
        Self {
            name: name.into(),
            router,
            broadcast: false,
        }
    }

    /// Handler that calls `router.broadcast` instead.
    pub fn broadcasting(name: impl Into<Cow<'static, str>>, router: RouterRef) -> Self {
        Self {
            broadcast: true,
            ..Self::new(name, router)
        }
    }
}

#[async_trait]
impl MessageHandler for RouteHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, message: Message) -> Result<(), DeliveryError> {
        let res = if self.broadcast {
            self.router.broadcast(message).await
        } else {
            self.router.send(message).await
        };
        res.map_err(DeliveryError::from)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::RouteError;
    use crate::handlers::{HandlerFn, HandlerRef};
    use crate::message::Channel;
    use crate::router::{ChannelRouter, Router};

    #[tokio::test]
    async fn routing_errors_become_delivery_errors() {
        let handler = RouteHandler::new("email-out", Arc::new(ChannelRouter::email()));
        assert_eq!(handler.name(), "email-out");

        let err = handler
            .handle(Message::new("m-1", "sys", Channel::Slack, "x"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DeliveryError::Route(Box::new(RouteError::ChannelMismatch {
                expected: Channel::Email,
                actual: Channel::Slack,
            }))
        );
        assert_eq!(err.as_label(), "delivery_route_failed");
    }

    #[tokio::test]
    async fn broadcasting_clears_the_recipient() {
        let router = Arc::new(ChannelRouter::new());
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let capture: HandlerRef = HandlerFn::arc("capture", move |m: Message| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().push(m.to);
                Ok::<_, DeliveryError>(())
            }
        });
        router.subscribe(Channel::Slack, capture);

        let msg = Message::new("m-1", "sys", Channel::Slack, "x").with_to("bob");
        RouteHandler::new("direct", router.clone())
            .handle(msg.clone())
            .await
            .unwrap();
        RouteHandler::broadcasting("all", router)
            .handle(msg)
            .await
            .unwrap();

        assert_eq!(*seen.lock(), vec![Some("bob".to_string()), None]);
    }
}
