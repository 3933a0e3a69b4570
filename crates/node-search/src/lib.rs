//! Node Search - live "find" results over workflow graph nodes
//!
//! This crate tracks the results of a one-shot node search and keeps them
//! consistent while the searched collection changes. It supports:
//!
//! - Ring-order "find next" / "find previous" traversal
//! - Identifier vs attribute matching, classified once per query
//! - Incremental updates from add/remove notifications
//! - Explicit attach/dispose against an injected change feed
//!
//! # Architecture
//!
//! - `SearchResultTracker`: ordered, deduplicated results with a cursor
//! - `NodeChangeFeed`: subscription source for collection changes
//! - `ViewLifecycle`: closed-view query consulted before late events apply
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use node_search::{AlwaysOpen, BroadcastNodeFeed, IdPattern, SearchResultTracker};
//!
//! let feed = Arc::new(BroadcastNodeFeed::new());
//! let tracker = Arc::new(SearchResultTracker::search(graph_nodes, "filter", &IdPattern::default()));
//! tracker.attach(feed.clone(), Arc::new(AlwaysOpen))?;
//! let first = tracker.next_result()?;
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod events;
pub mod query;
pub mod tracker;
pub mod view;

// Re-export key types
pub use config::{ConfigError, SearchConfig};
pub use entity::{NodeId, SearchableEntity, WorkflowNode};
pub use error::{Result, SearchError};
pub use events::{BroadcastNodeFeed, FeedSubscription, DEFAULT_EVENT_BUFFER, NodeChangeEvent, NodeChangeFeed, SubscriptionId};
pub use query::{find_matches, IdPattern, SearchMode, SearchQuery, DEFAULT_ID_PATTERN};
pub use tracker::{SearchResultTracker, TrackerUpdate};
pub use view::{AlwaysOpen, ViewHandle, ViewLifecycle};
