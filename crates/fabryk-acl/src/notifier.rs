//! Change notification for ACL mutations.
//!
//! [`ChangeNotifier`] fans an [`AclEvent`] out to every [`Subscription`]
//! interested in the changed resource or in any of its descendants (an
//! ancestor's ACL feeds a descendant's inherited panel).
//!
//! Each subscription owns a bounded queue. [`ChangeNotifier::publish`]
//! never waits: a full queue drops the event, which is harmless because
//! events only tell the subscriber to re-read current state. Dropping a
//! [`Subscription`] unregisters it immediately.
//!
//! ```text
//!  mutation commit ──► publish(event) ──try_send──► [queue] ──► Subscription (Stream)
//!                                     └─try_send──► [queue] ──► Subscription (Stream)
//! ```

use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::task::{Context, Poll};

use fabryk_core::ResourceId;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::audit::AuditId;
use crate::tree::ResourceTree;

/// Event name emitted on every committed ACL change.
pub const ACL_MODIFIED: &str = "ACLModified";

/// Default per-subscriber queue depth.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 16;

/// Kind of change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A resource's ACL or inheritance flag changed.
    #[serde(rename = "ACLModified")]
    AclModified,
}

impl EventKind {
    /// Wire name of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::AclModified => ACL_MODIFIED,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signal that a resource's ACL changed. Carries no diff: receivers
/// re-read current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEvent {
    /// Event kind.
    pub kind: EventKind,
    /// Resource whose ACL changed.
    pub resource: ResourceId,
    /// Audit entry recorded for the change, if any.
    pub id: Option<AuditId>,
}

impl AclEvent {
    /// An `ACLModified` event for `resource`.
    pub fn modified(resource: ResourceId, id: Option<AuditId>) -> Self {
        Self {
            kind: EventKind::AclModified,
            resource,
            id,
        }
    }
}

struct Subscriber {
    interests: Arc<[ResourceId]>,
    tx: mpsc::Sender<AclEvent>,
}

struct NotifierInner {
    tree: Arc<dyn ResourceTree>,
    buffer: usize,
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, Subscriber>>,
}

impl NotifierInner {
    fn unsubscribe(&self, id: u64) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if subscribers.remove(&id).is_some() {
            log::debug!("Subscription {id} released ({} remaining)", subscribers.len());
        }
    }
}

/// Publish/subscribe hub keyed by resource identity.
///
/// Cheap to clone (Arc internals).
#[derive(Clone)]
pub struct ChangeNotifier {
    inner: Arc<NotifierInner>,
}

impl ChangeNotifier {
    /// Creates a notifier; `buffer` is the per-subscriber queue depth.
    pub fn new(tree: Arc<dyn ResourceTree>, buffer: usize) -> Self {
        Self {
            inner: Arc::new(NotifierInner {
                tree,
                buffer: buffer.max(1),
                next_id: AtomicU64::new(1),
                subscribers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to changes affecting `resource`.
    pub fn subscribe(&self, resource: ResourceId) -> Subscription {
        self.subscribe_many(vec![resource])
    }

    /// Subscribe to changes affecting any of `resources`.
    ///
    /// One event is delivered per change even when several interests
    /// match it.
    pub fn subscribe_many(&self, resources: Vec<ResourceId>) -> Subscription {
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let interests: Arc<[ResourceId]> = resources.into();
        log::debug!("Subscription {id} opened for {} resource(s)", interests.len());
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                Subscriber {
                    interests: Arc::clone(&interests),
                    tx,
                },
            );
        Subscription {
            id,
            interests,
            rx,
            notifier: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `event` to every interested subscriber without blocking.
    ///
    /// Returns the number of subscribers the event was queued for.
    pub fn publish(&self, event: AclEvent) -> usize {
        let targets: Vec<(u64, Arc<[ResourceId]>, mpsc::Sender<AclEvent>)> = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, sub)| (*id, Arc::clone(&sub.interests), sub.tx.clone()))
            .collect();

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, interests, tx) in targets {
            if !self.affects(&event.resource, &interests) {
                continue;
            }
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    log::warn!(
                        "Subscription {id} is full; dropped {} for {}",
                        event.kind,
                        event.resource
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(id),
            }
        }
        for id in closed {
            self.inner.unsubscribe(id);
        }
        delivered
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Drops every subscription whose interests all lie in `gone`.
    ///
    /// Their streams end once any queued events are drained. Subscriptions
    /// still watching a live resource are kept. Returns the number dropped.
    pub fn release_resources(&self, gone: &[ResourceId]) -> usize {
        if gone.is_empty() {
            return 0;
        }
        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|_, sub| !sub.interests.iter().all(|r| gone.contains(r)));
        let released = before - subscribers.len();
        if released > 0 {
            log::debug!("Released {released} subscription(s) to destroyed resources");
        }
        released
    }

    fn affects(&self, changed: &ResourceId, interests: &[ResourceId]) -> bool {
        interests
            .iter()
            .any(|watched| watched == changed || self.inner.tree.is_ancestor(changed, watched))
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("buffer", &self.inner.buffer)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Lazy, unbounded stream of [`AclEvent`]s for a set of resources.
///
/// Ends only when the notifier is dropped. Dropping the subscription
/// unregisters it; re-subscribing starts fresh with no replay.
pub struct Subscription {
    id: u64,
    interests: Arc<[ResourceId]>,
    rx: mpsc::Receiver<AclEvent>,
    notifier: Weak<NotifierInner>,
}

impl Subscription {
    /// Waits for the next event.
    pub async fn recv(&mut self) -> Option<AclEvent> {
        self.rx.recv().await
    }

    /// Returns a queued event without waiting.
    pub fn try_recv(&mut self) -> Option<AclEvent> {
        self.rx.try_recv().ok()
    }

    /// Resources this subscription watches.
    pub fn interests(&self) -> &[ResourceId] {
        &self.interests
    }
}

impl Stream for Subscription {
    type Item = AclEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.notifier.upgrade() {
            inner.unsubscribe(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("interests", &self.interests)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::MemoryTree;
    use futures::StreamExt;
    use std::time::Duration;

    fn id(s: &str) -> ResourceId {
        ResourceId::new(s)
    }

    fn notifier(buffer: usize) -> ChangeNotifier {
        let tree = MemoryTree::new();
        tree.insert_root(id("root")).unwrap();
        tree.insert(id("docs"), id("root")).unwrap();
        tree.insert(id("reports"), id("docs")).unwrap();
        tree.insert(id("media"), id("root")).unwrap();
        ChangeNotifier::new(Arc::new(tree), buffer)
    }

    #[tokio::test]
    async fn test_subscriber_receives_own_resource() {
        let hub = notifier(4);
        let mut sub = hub.subscribe(id("docs"));

        assert_eq!(hub.publish(AclEvent::modified(id("docs"), None)), 1);
        let event = sub.recv().await.unwrap();
        assert_eq!(event.kind, EventKind::AclModified);
        assert_eq!(event.resource, id("docs"));
    }

    #[tokio::test]
    async fn test_descendant_subscriber_receives_ancestor_change() {
        let hub = notifier(4);
        let mut sub = hub.subscribe(id("reports"));

        hub.publish(AclEvent::modified(id("root"), None));
        let event = sub.recv().await.unwrap();
        assert_eq!(event.resource, id("root"));
    }

    #[test]
    fn test_unrelated_subscriber_not_notified() {
        let hub = notifier(4);
        let mut media = hub.subscribe(id("media"));
        let mut docs = hub.subscribe(id("docs"));

        // Child changes do not affect the parent.
        assert_eq!(hub.publish(AclEvent::modified(id("reports"), None)), 0);
        assert!(media.try_recv().is_none());
        assert!(docs.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_release_resources_ends_streams() {
        let hub = notifier(4);
        let mut gone = hub.subscribe(id("reports"));
        let mut partly = hub.subscribe_many(vec![id("reports"), id("media")]);
        let _docs = hub.subscribe(id("docs"));

        assert_eq!(hub.release_resources(&[id("reports")]), 1);
        assert_eq!(hub.subscriber_count(), 2);
        assert!(gone.next().await.is_none());

        hub.publish(AclEvent::modified(id("media"), None));
        assert_eq!(partly.recv().await.unwrap().resource, id("media"));
        assert_eq!(hub.release_resources(&[]), 0);
    }

    #[test]
    fn test_batch_subscription_single_delivery() {
        let hub = notifier(4);
        let mut sub = hub.subscribe_many(vec![id("docs"), id("reports")]);

        assert_eq!(hub.publish(AclEvent::modified(id("docs"), None)), 1);
        assert!(sub.try_recv().is_some());
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        let hub = notifier(1);
        let mut sub = hub.subscribe(id("docs"));

        assert_eq!(hub.publish(AclEvent::modified(id("docs"), None)), 1);
        assert_eq!(hub.publish(AclEvent::modified(id("docs"), None)), 0);
        assert!(sub.try_recv().is_some());
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_drop_releases_subscription() {
        let hub = notifier(4);
        let sub = hub.subscribe(id("docs"));
        assert_eq!(hub.subscriber_count(), 1);
        drop(sub);
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.publish(AclEvent::modified(id("docs"), None)), 0);
    }

    #[tokio::test]
    async fn test_resubscribe_has_no_replay() {
        let hub = notifier(4);
        hub.publish(AclEvent::modified(id("docs"), None));

        let mut sub = hub.subscribe(id("docs"));
        let next = tokio::time::timeout(Duration::from_millis(20), sub.next()).await;
        assert!(next.is_err(), "no buffered history expected");
    }

    #[tokio::test]
    async fn test_stream_ends_when_notifier_dropped() {
        let hub = notifier(4);
        let mut sub = hub.subscribe(id("docs"));
        drop(hub);
        assert!(sub.next().await.is_none());
    }

    #[test]
    fn test_event_kind_wire_name() {
        assert_eq!(EventKind::AclModified.to_string(), "ACLModified");
        let json = serde_json::to_string(&EventKind::AclModified).unwrap();
        assert_eq!(json, "\"ACLModified\"");
    }

    fn _assert_send_sync<T: Send + Sync>() {}
    fn _assert_send<T: Send>() {}
    #[test]
    fn test_notifier_send_sync() {
        _assert_send_sync::<ChangeNotifier>();
        _assert_send::<Subscription>();
    }
}
