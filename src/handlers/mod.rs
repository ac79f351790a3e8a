//! # Handler abstractions.
//!
//! - [`MessageHandler`] - async delivery function (queue processor, router subscriber)
//! - [`HandlerFn`] - closure-backed handler
//! - [`HandlerRef`] - shared handle (`Arc<dyn MessageHandler>`), identity = allocation
//! - [`FailureHandler`], [`FailureFn`], [`FailureRef`] - permanent-failure notification
//! - [`FailedDelivery`] - the record handed to a failure handler

mod failure;
mod handler;
mod handler_fn;

pub use failure::{FailedDelivery, FailureFn, FailureHandler, FailureRef};
pub use handler::{HandlerRef, MessageHandler};
pub use handler_fn::HandlerFn;
