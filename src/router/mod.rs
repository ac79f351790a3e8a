//! # Message routers.
//!
//! Routers fan a message out to the handlers subscribed to its channel. They do not
//! retry; wrap one in a [`RouteHandler`] and use it as a queue processor to get
//! retries.
//!
//! ## Contents
//! - [`Router`], [`RouterRef`] common capability (`send`, `broadcast`, `subscribe`, `unsubscribe`)
//! - [`ChannelRouter`] subscription table, unrestricted or restricted to one channel
//! - [`CompositeRouter`] one delegate router per channel
//! - [`RouteHandler`] a router as a [`MessageHandler`](crate::MessageHandler)
//!
//! ## Deployment shape
//! ```text
//!                          CompositeRouter
//!            ┌──────────────────┼──────────────────┐
//!            ▼                  ▼                  ▼
//!   ChannelRouter::slack ChannelRouter::email ChannelRouter::internal
//!     │        │            │                    │
//!   h1.handle h2.handle   h3.handle            h4.handle     (concurrent, all settle)
//! ```

mod channel;
mod composite;
mod forward;
#[allow(clippy::module_inception)]
mod router;
mod table;

pub use channel::ChannelRouter;
pub use composite::CompositeRouter;
pub use forward::RouteHandler;
pub use router::{Router, RouterRef};
