//! Retry policies.
//!
//! This module groups the knobs that control **how long** an entry waits between
//! failed attempts. **Whether** it is retried is decided by
//! [`QueueConfig::max_retries`](crate::QueueConfig::max_retries) alone.
//!
//! ## Contents
//! - [`RetryPolicy`] how the cooldown evolves (factor / max + jitter)
//! - [`JitterPolicy`] randomisation added on top of the cooldown
//!
//! ## Defaults
//! - `RetryPolicy::default()` → constant cooldown equal to `retry_delay`.
//! - `JitterPolicy::None`.

mod jitter;
mod retry;

pub use jitter::JitterPolicy;
pub use retry::RetryPolicy;
