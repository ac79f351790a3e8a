//! Error types used by the delivery queue, the routers and their handlers.
//!
//! - [`DeliveryError`] - one failed delivery attempt (returned by handlers).
//! - [`RouteError`] - a router refused or failed to deliver a message.
//! - [`ConfigError`] - a [`QueueConfig`](crate::QueueConfig) was rejected at build time.
//! - [`QueueError`] - the queue scheduler is no longer running.
//! - [`RuntimeError`] - queue shutdown overran its grace period.
//!
//! Every enum provides `as_label` (a short stable snake_case label) for logs.

use std::any::Any;
use std::time::Duration;

use thiserror::Error;

use crate::message::Channel;

/// # Failure of a single delivery attempt.
///
/// The queue treats every variant the same way: one failed attempt, retried
/// until `max_retries` attempts have been made.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The handler reported a failure.
    #[error("delivery failed: {reason}")]
    Fail {
        /// The underlying error message.
        reason: String,
    },

    /// The attempt exceeded the configured per-attempt timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// The handler panicked; the panic was caught.
    #[error("handler panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// The handler routed the message and the router failed.
    #[error("routing failed: {0}")]
    Route(Box<RouteError>),
}

impl DeliveryError {
    /// Shorthand for [`DeliveryError::Fail`].
    ///
    /// # Example
    /// ```
    /// use courier::DeliveryError;
    ///
    /// let err = DeliveryError::fail("smtp 451");
    /// assert_eq!(err.as_label(), "delivery_failed");
    /// assert_eq!(err.to_string(), "delivery failed: smtp 451");
    /// ```
    pub fn fail(reason: impl Into<String>) -> Self {
        DeliveryError::Fail {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            DeliveryError::Fail { .. } => "delivery_failed",
            DeliveryError::Timeout { .. } => "delivery_timeout",
            DeliveryError::Panicked { .. } => "delivery_panicked",
            DeliveryError::Route(_) => "delivery_route_failed",
        }
    }
}

impl From<RouteError> for DeliveryError {
    fn from(err: RouteError) -> Self {
        DeliveryError::Route(Box::new(err))
    }
}

/// # Errors returned by routers.
///
/// Routing failures are returned synchronously to the caller of `send` /
/// `broadcast`. Routers never retry.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// A router restricted to one channel was handed a message for another.
    #[error("{expected} router can only handle {expected} messages, got {actual}")]
    ChannelMismatch {
        /// Channel the router is restricted to.
        expected: Channel,
        /// Channel of the rejected message.
        actual: Channel,
    },

    /// A composite router has no delegate for the message's channel.
    #[error("no router registered for channel: {channel}")]
    NoRouter {
        /// Channel without a delegate.
        channel: Channel,
    },

    /// At least one subscribed handler failed. All handlers were still run.
    #[error("{failed} of {total} handlers failed on channel {channel}; first: {first}")]
    HandlersFailed {
        /// Channel the message was fanned out on.
        channel: Channel,
        /// Number of failed handlers.
        failed: usize,
        /// Number of handlers invoked.
        total: usize,
        /// First failure, in subscription order.
        first: Box<DeliveryError>,
    },
}

impl RouteError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use courier::{Channel, RouteError};
    ///
    /// let err = RouteError::NoRouter { channel: Channel::Email };
    /// assert_eq!(err.as_label(), "route_no_router");
    /// assert_eq!(err.to_string(), "no router registered for channel: email");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RouteError::ChannelMismatch { .. } => "route_channel_mismatch",
            RouteError::NoRouter { .. } => "route_no_router",
            RouteError::HandlersFailed { .. } => "route_handlers_failed",
        }
    }
}

/// # Invalid queue configuration.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// `max_retries` must allow at least one attempt.
    #[error("max_retries must be positive")]
    ZeroMaxRetries,

    /// `retry_delay` must be a positive duration.
    #[error("retry_delay must be positive")]
    ZeroRetryDelay,

    /// `max_concurrent` must allow at least one in-flight attempt.
    #[error("max_concurrent must be positive")]
    ZeroMaxConcurrent,

    /// Retry growth factor must be finite and `>= 1.0`.
    #[error("retry factor must be finite and >= 1.0, got {factor}")]
    InvalidRetryFactor {
        /// The rejected factor.
        factor: f64,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::ZeroMaxRetries => "config_zero_max_retries",
            ConfigError::ZeroRetryDelay => "config_zero_retry_delay",
            ConfigError::ZeroMaxConcurrent => "config_zero_max_concurrent",
            ConfigError::InvalidRetryFactor { .. } => "config_invalid_retry_factor",
        }
    }
}

/// # The queue scheduler is gone.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The scheduler has exited (shutdown, or every handle was dropped).
    #[error("delivery queue closed")]
    Closed,
}

/// # Errors produced while stopping a queue.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// In-flight attempts were still running when the grace period ended.
    /// They keep running in the background until they settle.
    #[error("shutdown grace {grace:?} exceeded; in flight: {in_flight:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Ids of messages whose attempts had not completed.
        in_flight: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

/// Renders a caught panic payload as text.
pub(crate) fn panic_info(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_error_converts_into_delivery_error() {
        let err: DeliveryError = RouteError::NoRouter {
            channel: Channel::Slack,
        }
        .into();
        assert_eq!(err.as_label(), "delivery_route_failed");
        assert_eq!(
            err.to_string(),
            "routing failed: no router registered for channel: slack"
        );
    }

    #[test]
    fn channel_mismatch_names_both_channels() {
        let err = RouteError::ChannelMismatch {
            expected: Channel::Slack,
            actual: Channel::Email,
        };
        assert_eq!(
            err.to_string(),
            "slack router can only handle slack messages, got email"
        );
    }

    #[test]
    fn panic_info_reads_str_and_string_payloads() {
        let p: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_info(p.as_ref()), "boom");
        let p: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_info(p.as_ref()), "bang");
        let p: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_info(p.as_ref()), "unknown panic");
    }
}
