//! Error types for node search

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias using SearchError
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors that can occur while building or driving a search result tracker
#[derive(Debug, Error)]
pub enum SearchError {
    /// Start index does not address an entry of the initial match list
    #[error("Invalid start index {index} for {len} search results")]
    InvalidStartIndex { index: usize, len: usize },

    /// Traversal requested on a tracker with no results
    #[error("Search result set is empty")]
    EmptyResultSet,

    /// Tracker is already subscribed to a change feed
    #[error("Search results are already attached to a change feed")]
    AlreadyAttached,

    /// Tracker was disposed and can no longer be attached
    #[error("Search results have been disposed")]
    Disposed,

    /// Identifier pattern failed to compile
    #[error("Invalid identifier pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Change feed no longer accepts subscribers
    #[error("Change feed closed")]
    FeedClosed,

    /// Configuration could not be loaded or saved
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl SearchError {
    /// Create an invalid start index error
    pub fn invalid_start(index: usize, len: usize) -> Self {
        Self::InvalidStartIndex { index, len }
    }
}
