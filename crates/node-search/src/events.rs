//! Change events from the searched node collection
//!
//! The collection being searched (a workflow graph, a node repository, ...)
//! reports additions and removals through a [`NodeChangeFeed`]. The feed is
//! passed to whoever needs it rather than looked up globally, so several
//! independent collections can each drive their own search results.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::{Result, SearchError};

/// Identifier of a single feed subscription
pub type SubscriptionId = u64;

/// A change in the searched collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeChangeEvent<E> {
    /// An entity was added to the collection
    Added(E),
    /// An entity was removed from the collection
    Removed(E),
    /// Any other change (moves, renames, connection edits, ...)
    Other,
}

/// Default capacity of each subscription's event buffer
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// A live subscription: its id and the receiving end of its event stream
///
/// Events arrive in the order the changes happened, each exactly once.
pub struct FeedSubscription<E> {
    pub id: SubscriptionId,
    pub events: mpsc::Receiver<NodeChangeEvent<E>>,
}

/// Trait for sources of node change notifications
///
/// This abstracts over where changes come from so trackers can be driven by
/// a real graph model, a test harness, or a remote bridge.
pub trait NodeChangeFeed<E>: Send + Sync {
    /// Open a new subscription
    ///
    /// Returns an error if the feed no longer accepts subscribers.
    fn subscribe(&self) -> Result<FeedSubscription<E>>;

    /// Close a subscription; unknown ids are ignored
    fn unsubscribe(&self, id: SubscriptionId);
}

/// In-process feed that fans every published event out to all subscribers
///
/// Each subscription gets a bounded buffer. Publishing waits for room
/// rather than dropping events, so a slow subscriber applies back-pressure
/// to the publisher. Events must be published from a single task to keep
/// one delivery order across subscribers.
pub struct BroadcastNodeFeed<E> {
    subscribers: Mutex<Vec<(SubscriptionId, mpsc::Sender<NodeChangeEvent<E>>)>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    buffer: usize,
}

impl<E: Clone + Send + 'static> BroadcastNodeFeed<E> {
    /// Create a feed with the default per-subscription buffer
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_EVENT_BUFFER)
    }

    /// Create a feed whose subscriptions buffer up to `buffer` events (at least 1)
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            buffer: buffer.max(1),
        }
    }

    /// Capacity of each subscription's buffer
    pub fn buffer(&self) -> usize {
        self.buffer
    }

    /// Deliver an event to every live subscriber
    ///
    /// Waits while a subscriber's buffer is full. Returns the number of
    /// subscribers that received the event; subscribers whose receiver has
    /// gone away are pruned.
    pub async fn publish(&self, event: NodeChangeEvent<E>) -> usize {
        let targets: Vec<_> = self.subscribers.lock().clone();

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, tx) in targets {
            if tx.send(event.clone()).await.is_ok() {
                delivered += 1;
            } else {
                log::warn!("Dropping closed change feed subscriber {}", id);
                closed.push(id);
            }
        }

        if !closed.is_empty() {
            self.subscribers.lock().retain(|(id, _)| !closed.contains(id));
        }
        delivered
    }

    /// Report an added entity
    pub async fn added(&self, entity: E) -> usize {
        self.publish(NodeChangeEvent::Added(entity)).await
    }

    /// Report a removed entity
    pub async fn removed(&self, entity: E) -> usize {
        self.publish(NodeChangeEvent::Removed(entity)).await
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Stop accepting subscribers and end every open event stream
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.subscribers.lock().clear();
    }
}

impl<E: Clone + Send + 'static> Default for BroadcastNodeFeed<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone + Send + 'static> NodeChangeFeed<E> for BroadcastNodeFeed<E> {
    fn subscribe(&self) -> Result<FeedSubscription<E>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SearchError::FeedClosed);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(self.buffer);
        self.subscribers.lock().push((id, tx));
        Ok(FeedSubscription { id, events: rx })
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.lock().retain(|(sub_id, _)| *sub_id != id);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers_in_order() {
        let feed = BroadcastNodeFeed::<u32>::new();
        let mut first = feed.subscribe().unwrap();
        let mut second = feed.subscribe().unwrap();
        assert_ne!(first.id, second.id);

        assert_eq!(feed.added(1).await, 2);
        assert_eq!(feed.removed(1).await, 2);
        assert_eq!(feed.publish(NodeChangeEvent::Other).await, 2);

        for sub in [&mut first, &mut second] {
            assert_eq!(sub.events.try_recv().unwrap(), NodeChangeEvent::Added(1));
            assert_eq!(sub.events.try_recv().unwrap(), NodeChangeEvent::Removed(1));
            assert_eq!(sub.events.try_recv().unwrap(), NodeChangeEvent::Other);
            assert!(sub.events.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let feed = BroadcastNodeFeed::<u32>::new();
        let mut sub = feed.subscribe().unwrap();

        feed.unsubscribe(sub.id);
        assert_eq!(feed.subscriber_count(), 0);
        assert_eq!(feed.added(5).await, 0);
        assert!(sub.events.try_recv().is_err());

        // Unknown ids are ignored
        feed.unsubscribe(999);
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_pruned() {
        let feed = BroadcastNodeFeed::<u32>::new();
        let sub = feed.subscribe().unwrap();
        drop(sub);

        assert_eq!(feed.added(1).await, 0);
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn test_closed_feed_rejects_subscribers() {
        let feed = BroadcastNodeFeed::<u32>::new();
        let mut sub = feed.subscribe().unwrap();

        feed.close();

        assert!(matches!(feed.subscribe(), Err(SearchError::FeedClosed)));
        assert!(matches!(
            sub.events.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_buffer_size_default_and_floor() {
        assert_eq!(BroadcastNodeFeed::<u32>::new().buffer(), DEFAULT_EVENT_BUFFER);
        assert_eq!(BroadcastNodeFeed::<u32>::with_buffer(0).buffer(), 1);
        assert_eq!(BroadcastNodeFeed::<u32>::with_buffer(8).buffer(), 8);
    }

    #[tokio::test]
    async fn test_full_buffer_waits_for_receiver() {
        let feed = BroadcastNodeFeed::<u32>::with_buffer(1);
        let mut sub = feed.subscribe().unwrap();

        assert_eq!(feed.added(1).await, 1);

        // Second event has no room until the first is received
        let blocked = tokio::time::timeout(Duration::from_millis(20), feed.added(2)).await;
        assert!(blocked.is_err());

        assert_eq!(sub.events.recv().await, Some(NodeChangeEvent::Added(1)));
        assert_eq!(feed.added(3).await, 1);
        assert_eq!(sub.events.recv().await, Some(NodeChangeEvent::Added(3)));
        assert!(sub.events.try_recv().is_err());
    }
}
