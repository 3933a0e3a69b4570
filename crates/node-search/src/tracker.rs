//! Live search results with ring traversal
//!
//! A [`SearchResultTracker`] holds the matches of one search invocation and
//! lets the UI step through them cyclically ("find next"). While attached to
//! a [`NodeChangeFeed`] it follows the searched collection: removed entities
//! leave the results, and newly added entities that satisfy the original
//! query are appended.
//!
//! # Concurrency
//!
//! The result sequence, its mirror set and the cursor are guarded by a single
//! lock. Change events are applied by one dispatcher task per tracker, so
//! handlers are serialized with each other but may interleave with
//! `next_result` calls from the UI thread. The lock is never held across an
//! `.await`.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::entity::SearchableEntity;
use crate::error::{Result, SearchError};
use crate::events::{NodeChangeEvent, NodeChangeFeed, SubscriptionId};
use crate::query::{find_matches, IdPattern, SearchQuery};
use crate::view::{AlwaysOpen, ViewLifecycle};

/// Outcome of applying one change event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerUpdate {
    /// A matching entity was appended at `index`
    Appended { index: usize },
    /// A tracked entity was removed from `index`
    ///
    /// `was_current` is set when it was the entity last returned by
    /// traversal, so the UI can decide whether to move on.
    Removed { index: usize, was_current: bool },
    /// The event did not affect the results
    Ignored,
    /// The tracker was disposed or its view closed; nothing was touched
    Dropped,
}

struct ResultState<E> {
    results: Vec<E>,
    result_set: HashSet<E>,
    /// Index of the last returned entity, -1 before the first step
    cursor: isize,
    disposed: bool,
}

struct Attachment<E> {
    feed: Arc<dyn NodeChangeFeed<E>>,
    subscription: SubscriptionId,
    dispatcher: JoinHandle<()>,
}

/// Ordered, deduplicated results of a search, kept in sync with the
/// searched collection
pub struct SearchResultTracker<E: SearchableEntity> {
    state: Mutex<ResultState<E>>,
    query: SearchQuery,
    attachment: Mutex<Option<Attachment<E>>>,
}

impl<E: SearchableEntity> SearchResultTracker<E> {
    /// Create a tracker from an initial match list
    ///
    /// `start_index` addresses the match the caller is already showing; the
    /// first `next_result` returns the one after it. Later duplicates in
    /// `matches` are dropped. An empty match list is accepted with a start
    /// index of 0 and yields a tracker that has not started yet.
    pub fn new(matches: Vec<E>, start_index: usize, query: SearchQuery) -> Result<Self> {
        if matches.is_empty() {
            if start_index != 0 {
                return Err(SearchError::invalid_start(start_index, 0));
            }
            return Ok(Self::with_cursor(Vec::new(), -1, query));
        }
        if start_index >= matches.len() {
            return Err(SearchError::invalid_start(start_index, matches.len()));
        }

        let start = matches[start_index].clone();
        let mut seen = HashSet::with_capacity(matches.len());
        let results: Vec<E> = matches.into_iter().filter(|e| seen.insert(e.clone())).collect();
        let cursor = results.iter().position(|e| *e == start).unwrap_or(0) as isize;

        Ok(Self::with_cursor(results, cursor, query))
    }

    /// Run a search over `entities` and track its matches
    ///
    /// The tracker starts before the first match.
    pub fn search<I>(entities: I, raw_text: &str, pattern: &IdPattern) -> Self
    where
        I: IntoIterator<Item = E>,
    {
        let query = SearchQuery::new(raw_text, pattern);
        let results = find_matches(entities, &query);
        log::debug!(
            "Search '{}' ({:?}) found {} results",
            query.text(),
            query.mode(),
            results.len()
        );
        Self::with_cursor(results, -1, query)
    }

    fn with_cursor(results: Vec<E>, cursor: isize, query: SearchQuery) -> Self {
        let result_set = results.iter().cloned().collect();
        Self {
            state: Mutex::new(ResultState {
                results,
                result_set,
                cursor,
                disposed: false,
            }),
            query,
            attachment: Mutex::new(None),
        }
    }

    /// Step forward in ring order and return the entity there
    pub fn next_result(&self) -> Result<E> {
        let mut state = self.state.lock();
        let len = state.results.len() as isize;
        if len == 0 {
            return Err(SearchError::EmptyResultSet);
        }
        state.cursor += 1;
        if state.cursor >= len {
            state.cursor = 0;
        }
        Ok(state.results[state.cursor as usize].clone())
    }

    /// Step backward in ring order and return the entity there
    pub fn previous_result(&self) -> Result<E> {
        let mut state = self.state.lock();
        let len = state.results.len() as isize;
        if len == 0 {
            return Err(SearchError::EmptyResultSet);
        }
        state.cursor = if state.cursor <= 0 { len - 1 } else { state.cursor - 1 };
        Ok(state.results[state.cursor as usize].clone())
    }

    /// The entity last returned by traversal, if any
    pub fn current(&self) -> Option<E> {
        let state = self.state.lock();
        usize::try_from(state.cursor)
            .ok()
            .and_then(|i| state.results.get(i))
            .cloned()
    }

    /// Cursor position; -1 before the first step
    pub fn cursor(&self) -> isize {
        self.state.lock().cursor
    }

    /// Snapshot of the current results in order
    pub fn results(&self) -> Vec<E> {
        self.state.lock().results.clone()
    }

    /// Number of tracked results
    pub fn len(&self) -> usize {
        self.state.lock().results.len()
    }

    /// Check if there are no results to traverse
    pub fn is_empty(&self) -> bool {
        self.state.lock().results.is_empty()
    }

    /// The query this tracker was built for
    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    /// Check if the tracker is subscribed to a change feed
    ///
    /// Turns false once the tracker is disposed or its dispatcher has
    /// stopped (feed closed, view closed).
    pub fn is_attached(&self) -> bool {
        self.attachment.lock().is_some()
    }

    /// Check if `dispose` has been called
    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// Apply a change event from the searched collection
    pub fn apply(&self, event: NodeChangeEvent<E>) -> TrackerUpdate {
        self.apply_for_view(&AlwaysOpen, event)
    }

    /// Apply a change event unless the owning view has been closed
    pub fn apply_for_view(&self, view: &dyn ViewLifecycle, event: NodeChangeEvent<E>) -> TrackerUpdate {
        match event {
            NodeChangeEvent::Removed(entity) => self.handle_removed(view, &entity),
            NodeChangeEvent::Added(entity) => self.handle_added(view, entity),
            NodeChangeEvent::Other => TrackerUpdate::Ignored,
        }
    }

    fn handle_removed(&self, view: &dyn ViewLifecycle, entity: &E) -> TrackerUpdate {
        let mut state = self.state.lock();
        if state.disposed || view.is_closed() {
            log::debug!("Dropping removal of {} after teardown", entity.identifier());
            return TrackerUpdate::Dropped;
        }
        if !state.result_set.remove(entity) {
            return TrackerUpdate::Ignored;
        }
        let Some(index) = state.results.iter().position(|e| e == entity) else {
            return TrackerUpdate::Ignored;
        };
        state.results.remove(index);

        let was_current = index as isize == state.cursor;
        if index as isize <= state.cursor {
            state.cursor -= 1;
        }
        log::debug!(
            "Removed search result {} at {} (cursor now {})",
            entity.identifier(),
            index,
            state.cursor
        );
        TrackerUpdate::Removed { index, was_current }
    }

    fn handle_added(&self, view: &dyn ViewLifecycle, entity: E) -> TrackerUpdate {
        // Matching derives text from the entity, so do it outside the lock
        let matches = self.query.matches(&entity);

        let mut state = self.state.lock();
        if state.disposed || view.is_closed() {
            log::debug!("Dropping addition of {} after teardown", entity.identifier());
            return TrackerUpdate::Dropped;
        }
        if !matches || state.result_set.contains(&entity) {
            return TrackerUpdate::Ignored;
        }
        log::debug!("Appending search result {}", entity.identifier());
        state.result_set.insert(entity.clone());
        state.results.push(entity);
        TrackerUpdate::Appended {
            index: state.results.len() - 1,
        }
    }

    /// Subscribe to a change feed
    ///
    /// Events are applied in delivery order by a dispatcher task spawned on
    /// the current tokio runtime. The dispatcher holds only a weak reference,
    /// so dropping the tracker ends it. A tracker attaches at most once.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn attach(
        self: &Arc<Self>,
        feed: Arc<dyn NodeChangeFeed<E>>,
        view: Arc<dyn ViewLifecycle>,
    ) -> Result<()> {
        let mut attachment = self.attachment.lock();
        if self.is_disposed() {
            return Err(SearchError::Disposed);
        }
        if attachment.is_some() {
            return Err(SearchError::AlreadyAttached);
        }

        let subscription = feed.subscribe()?;
        let subscription_id = subscription.id;
        let mut events = subscription.events;
        let weak: Weak<Self> = Arc::downgrade(self);

        let dispatcher = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(tracker) = weak.upgrade() else {
                    break;
                };
                if tracker.apply_for_view(view.as_ref(), event) == TrackerUpdate::Dropped {
                    break;
                }
            }
            if let Some(tracker) = weak.upgrade() {
                tracker.finish_dispatch(subscription_id);
            }
        });

        log::info!(
            "Search results for '{}' attached to change feed (subscription {})",
            self.query.text(),
            subscription_id
        );
        *attachment = Some(Attachment {
            feed,
            subscription: subscription_id,
            dispatcher,
        });
        Ok(())
    }

    /// Clear the attachment once its dispatcher has stopped on its own
    fn finish_dispatch(&self, subscription: SubscriptionId) {
        let mut attachment = self.attachment.lock();
        if attachment.as_ref().map(|a| a.subscription) != Some(subscription) {
            return;
        }
        if let Some(finished) = attachment.take() {
            finished.feed.unsubscribe(subscription);
            log::debug!(
                "Change feed dispatch for '{}' ended (subscription {})",
                self.query.text(),
                subscription
            );
        }
    }

    /// Unsubscribe from the change feed and stop applying events
    ///
    /// Safe to call repeatedly and when never attached. Events already in
    /// flight are dropped.
    pub fn dispose(&self) {
        self.state.lock().disposed = true;

        if let Some(attachment) = self.attachment.lock().take() {
            attachment.feed.unsubscribe(attachment.subscription);
            attachment.dispatcher.abort();
            log::info!(
                "Search results for '{}' detached (subscription {})",
                self.query.text(),
                attachment.subscription
            );
        }
    }
}

impl<E: SearchableEntity> Drop for SearchResultTracker<E> {
    fn drop(&mut self) {
        self.dispose();
    }
}
