use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MessageMetadata;

/// Logical delivery medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Slack,
    Email,
    Internal,
}

impl Channel {
    /// All channels, in declaration order.
    pub const ALL: [Channel; 3] = [Channel::Slack, Channel::Email, Channel::Internal];

    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Slack => "slack",
            Channel::Email => "email",
            Channel::Internal => "internal",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message addressed to an agent or external address on one channel.
///
/// `id` is the identity key used by the delivery queue; keeping it unique is the
/// caller's job. `to = None` means broadcast.
///
/// # Example
/// ```
/// use courier::{Channel, Message};
///
/// let msg = Message::new("m-1", "system", Channel::Slack, "deploy finished")
///     .with_to("U123");
/// assert_eq!(msg.to.as_deref(), Some("U123"));
/// assert!(msg.clone().into_broadcast().is_broadcast());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique id; the queue keys its entries by it.
    pub id: String,
    /// Sender (user id, bot or system component).
    pub from: String,
    /// Recipient; `None` for a broadcast.
    pub to: Option<String>,
    /// Message body.
    pub content: String,
    /// Delivery medium; selects the router.
    pub channel: Channel,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Optional channel context (priority, thread, attachments, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl Message {
    /// Creates a broadcast message stamped with the current time.
    pub fn new(
        id: impl Into<String>,
        from: impl Into<String>,
        channel: Channel,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            to: None,
            content: content.into(),
            channel,
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    /// Sets the recipient.
    #[inline]
    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    /// Overrides the creation timestamp.
    #[inline]
    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = at;
        self
    }

    /// Attaches channel-specific metadata.
    #[inline]
    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// True when the message has no recipient.
    #[inline]
    pub fn is_broadcast(&self) -> bool {
        self.to.is_none()
    }

    /// Returns the same message with the recipient cleared.
    #[inline]
    pub fn into_broadcast(mut self) -> Self {
        self.to = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Priority;

    #[test]
    fn channel_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Channel::Email).unwrap(), "\"email\"");
        let ch: Channel = serde_json::from_str("\"internal\"").unwrap();
        assert_eq!(ch, Channel::Internal);
        assert_eq!(Channel::Slack.to_string(), "slack");
    }

    #[test]
    fn wire_format_uses_camel_case_and_null_recipient() {
        let msg = Message::new("m-1", "system", Channel::Slack, "hi").with_metadata(
            MessageMetadata {
                priority: Some(Priority::High),
                thread_id: Some("T1".into()),
                ..MessageMetadata::default()
            },
        );
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["to"], serde_json::Value::Null);
        assert_eq!(json["channel"], "slack");
        assert_eq!(json["metadata"]["threadId"], "T1");
        assert_eq!(json["metadata"]["priority"], "high");
    }

    #[test]
    fn broadcast_keeps_everything_but_recipient() {
        let msg = Message::new("m-2", "agent-7", Channel::Email, "body").with_to("a@b.c");
        let b = msg.clone().into_broadcast();
        assert!(b.is_broadcast());
        assert_eq!(b.id, msg.id);
        assert_eq!(b.content, msg.content);
        assert_eq!(b.timestamp, msg.timestamp);
    }
}
