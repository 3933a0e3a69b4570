//! Searchable entities
//!
//! A search runs over anything that has a stable identity and a textual
//! representation. Workflow nodes are the main case, but the tracker only
//! relies on the [`SearchableEntity`] trait.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Unique identifier for a node
pub type NodeId = String;

/// An item that can be found by a search and tracked in a result set
///
/// Equality and hashing must follow identity: two values that refer to the
/// same item compare equal even if their display text differs.
pub trait SearchableEntity: Clone + Eq + Hash + Send + Sync + 'static {
    /// Stable identifier used for identifier-mode matching
    fn identifier(&self) -> String;

    /// Text used for attribute-mode matching
    fn searchable_text(&self) -> String;
}

/// A node instance on the workflow canvas
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowNode {
    /// Unique identifier for this node instance (e.g., "node:42")
    pub id: NodeId,
    /// Node type (e.g., "row-filter")
    pub node_type: String,
    /// Human-readable label shown on the canvas
    pub label: String,
    /// Optional user annotation below the node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    /// Custom data/configuration for this instance
    #[serde(default)]
    pub data: serde_json::Value,
}

impl WorkflowNode {
    /// Create a node with the given id, type and label
    pub fn new(id: impl Into<String>, node_type: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            label: label.into(),
            annotation: None,
            data: serde_json::Value::Null,
        }
    }

    /// Attach an annotation to the node
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    /// Set the node's configuration data
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

impl PartialEq for WorkflowNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for WorkflowNode {}

impl Hash for WorkflowNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl SearchableEntity for WorkflowNode {
    fn identifier(&self) -> String {
        self.id.clone()
    }

    fn searchable_text(&self) -> String {
        let mut text = format!("{} {}", self.label, self.node_type);
        if let Some(annotation) = &self.annotation {
            text.push(' ');
            text.push_str(annotation);
        }
        text
    }
}
