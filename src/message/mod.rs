//! # Message data model.
//!
//! - [`Message`] the unit routed and queued by the crate (identity = `id`)
//! - [`Channel`] closed set of delivery media
//! - [`MessageMetadata`], [`Attachment`], [`Priority`] optional channel context

#[allow(clippy::module_inception)]
mod message;
mod metadata;

pub use message::{Channel, Message};
pub use metadata::{Attachment, MessageMetadata, Priority};
