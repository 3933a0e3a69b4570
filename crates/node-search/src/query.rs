//! Search query classification and matching
//!
//! A query is classified once, when it is created: if the text looks like a
//! node identifier it is matched against entity identifiers, otherwise
//! against their searchable text.

use std::collections::HashSet;

use regex::Regex;

use crate::entity::SearchableEntity;
use crate::error::Result;

/// Default grammar for identifier-looking queries ("node:42", "#42", "3:12")
pub const DEFAULT_ID_PATTERN: &str = r"^(?:node:|#)?\d+(?::\d+)*$";

/// How a query is compared against entities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Compare against the entity's stable identifier
    Identifier,
    /// Compare against the entity's searchable text
    Attribute,
}

/// Predicate deciding whether a query should run in identifier mode
#[derive(Debug, Clone)]
pub struct IdPattern {
    regex: Regex,
}

impl IdPattern {
    /// Compile an identifier pattern
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    /// Check if the (already lowercased) query looks like an identifier
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// The source pattern
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl Default for IdPattern {
    fn default() -> Self {
        Self {
            regex: Regex::new(DEFAULT_ID_PATTERN).expect("default id pattern compiles"),
        }
    }
}

/// A lowercased search string with its fixed matching mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    text: String,
    mode: SearchMode,
}

impl SearchQuery {
    /// Lowercase the raw text and classify it
    pub fn new(raw: &str, pattern: &IdPattern) -> Self {
        let text = raw.to_lowercase();
        let mode = if pattern.is_match(&text) {
            SearchMode::Identifier
        } else {
            SearchMode::Attribute
        };
        Self { text, mode }
    }

    /// The lowercased query text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The matching mode chosen at construction
    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    /// Check whether an entity satisfies this query
    pub fn matches<E: SearchableEntity>(&self, entity: &E) -> bool {
        let haystack = match self.mode {
            SearchMode::Identifier => entity.identifier(),
            SearchMode::Attribute => entity.searchable_text(),
        };
        haystack.to_lowercase().contains(&self.text)
    }
}

/// Run a one-shot search over a collection
///
/// Returns the matching entities in collection order, without duplicates.
pub fn find_matches<E, I>(entities: I, query: &SearchQuery) -> Vec<E>
where
    E: SearchableEntity,
    I: IntoIterator<Item = E>,
{
    let mut seen = HashSet::new();
    entities
        .into_iter()
        .filter(|entity| query.matches(entity))
        .filter(|entity| seen.insert(entity.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::WorkflowNode;

    #[test]
    fn test_find_matches_keeps_order_and_dedups() {
        let nodes = vec![
            WorkflowNode::new("node:1", "row-filter", "Row Filter"),
            WorkflowNode::new("node:2", "sorter", "Sorter"),
            WorkflowNode::new("node:3", "column-filter", "Column Filter"),
            WorkflowNode::new("node:1", "row-filter", "Row Filter"),
        ];
        let query = SearchQuery::new("Filter", &IdPattern::default());

        let ids: Vec<_> = find_matches(nodes, &query).into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["node:1", "node:3"]);
    }

    #[test]
    fn test_classification() {
        let pattern = IdPattern::default();

        assert_eq!(SearchQuery::new("node:42", &pattern).mode(), SearchMode::Identifier);
        assert_eq!(SearchQuery::new("NODE:42", &pattern).mode(), SearchMode::Identifier);
        assert_eq!(SearchQuery::new("#7", &pattern).mode(), SearchMode::Identifier);
        assert_eq!(SearchQuery::new("3:12", &pattern).mode(), SearchMode::Identifier);
        assert_eq!(SearchQuery::new("filter", &pattern).mode(), SearchMode::Attribute);
        assert_eq!(SearchQuery::new("node:", &pattern).mode(), SearchMode::Attribute);
    }

    #[test]
    fn test_query_is_lowercased() {
        let query = SearchQuery::new("Row FILTER", &IdPattern::default());
        assert_eq!(query.text(), "row filter");
    }

    #[test]
    fn test_attribute_matching() {
        let query = SearchQuery::new("filter", &IdPattern::default());

        assert!(query.matches(&WorkflowNode::new("node:1", "row-filter", "Row Filter")));
        assert!(!query.matches(&WorkflowNode::new("node:2", "sorter", "Sorter")));
    }

    #[test]
    fn test_identifier_matching_is_substring() {
        let query = SearchQuery::new("node:42", &IdPattern::default());

        assert!(query.matches(&WorkflowNode::new("node:427", "sorter", "Sorter")));
        assert!(!query.matches(&WorkflowNode::new("node:43", "sorter", "node:42 copy")));
    }

    #[test]
    fn test_custom_pattern() {
        let pattern = IdPattern::new(r"^n\d+$").unwrap();

        assert_eq!(SearchQuery::new("N12", &pattern).mode(), SearchMode::Identifier);
        assert_eq!(SearchQuery::new("node:12", &pattern).mode(), SearchMode::Attribute);
        assert_eq!(pattern.as_str(), r"^n\d+$");
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(IdPattern::new("(unclosed").is_err());
    }
}
