//! Channel → handler subscription table.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::handlers::HandlerRef;
use crate::message::Channel;

/// Ordered, identity-deduplicated handler sets keyed by channel.
///
/// The lock is held only to insert, remove or copy out a set.
#[derive(Default)]
pub(crate) struct SubscriptionTable {
    inner: RwLock<HashMap<Channel, Vec<HandlerRef>>>,
}

impl SubscriptionTable {
    /// Returns `false` if `handler` was already subscribed to `channel`.
    pub fn insert(&self, channel: Channel, handler: HandlerRef) -> bool {
        let mut map = self.inner.write();
        let set = map.entry(channel).or_default();
        if set.iter().any(|h| Arc::ptr_eq(h, &handler)) {
            return false;
        }
        set.push(handler);
        true
    }

    /// Returns `false` if `handler` was not subscribed to `channel`.
    pub fn remove(&self, channel: Channel, handler: &HandlerRef) -> bool {
        let mut map = self.inner.write();
        let Some(set) = map.get_mut(&channel) else {
            return false;
        };
        let before = set.len();
        set.retain(|h| !Arc::ptr_eq(h, handler));
        let removed = set.len() != before;
        if set.is_empty() {
            map.remove(&channel);
        }
        removed
    }

    /// Copy of the handlers subscribed to `channel`, in subscription order.
    pub fn snapshot(&self, channel: Channel) -> Vec<HandlerRef> {
        self.inner
            .read()
            .get(&channel)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeliveryError;
    use crate::handlers::HandlerFn;
    use crate::message::Message;

    fn handler(name: &'static str) -> HandlerRef {
        HandlerFn::arc(name, |_m: Message| async { Ok::<_, DeliveryError>(()) })
    }

    fn names(set: &[HandlerRef]) -> Vec<&str> {
        set.iter().map(|h| h.name()).collect()
    }

    #[test]
    fn keeps_order_and_ignores_duplicates() {
        let table = SubscriptionTable::default();
        let (a, b) = (handler("a"), handler("b"));

        assert!(table.insert(Channel::Slack, a.clone()));
        assert!(table.insert(Channel::Slack, b.clone()));
        assert!(!table.insert(Channel::Slack, a.clone()));

        assert_eq!(names(&table.snapshot(Channel::Slack)), ["a", "b"]);
        assert!(table.snapshot(Channel::Email).is_empty());
    }

    #[test]
    fn identity_is_the_allocation() {
        let table = SubscriptionTable::default();
        table.insert(Channel::Email, handler("same"));
        table.insert(Channel::Email, handler("same"));
        assert_eq!(table.snapshot(Channel::Email).len(), 2);
    }

    #[test]
    fn remove_is_a_noop_when_absent() {
        let table = SubscriptionTable::default();
        let a = handler("a");
        assert!(!table.remove(Channel::Internal, &a));

        table.insert(Channel::Internal, a.clone());
        assert!(table.remove(Channel::Internal, &a));
        assert!(!table.remove(Channel::Internal, &a));
        assert!(table.snapshot(Channel::Internal).is_empty());
    }

    #[test]
    fn snapshot_is_detached_from_later_changes() {
        let table = SubscriptionTable::default();
        let a = handler("a");
        table.insert(Channel::Slack, a.clone());

        let snap = table.snapshot(Channel::Slack);
        table.remove(Channel::Slack, &a);
        assert_eq!(snap.len(), 1);
    }
}
