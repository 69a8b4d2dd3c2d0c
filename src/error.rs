//! Error types for graphony

use thiserror::Error;

use crate::id::{EdgeId, NodeId};
use crate::weight::WeightType;

/// Result type alias using `GraphError`.
pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    /// A node name bound in a query or lookup is not registered.
    #[error("unknown node: {0}")]
    MissingNode(String),

    /// A node id has no registered name.
    #[error("unknown node id: {0}")]
    MissingNodeId(NodeId),

    /// A relation name bound in a query or lookup is not registered.
    #[error("unknown relation: {0}")]
    MissingRelation(String),

    /// A supplied edge id names no hyperedge of the relation.
    #[error("relation {relation} has no hyperedge {edge}")]
    MissingEdge { relation: String, edge: EdgeId },

    #[error("invalid relation name {name:?}: {reason}")]
    InvalidRelationName { name: String, reason: String },

    #[error("relation {relation} stores {expected} weights, got {found}")]
    WeightType {
        relation: String,
        expected: WeightType,
        found: WeightType,
    },

    /// Endpoint cardinality does not fit the relation's mode.
    #[error("shape error in relation {relation}: {reason}")]
    Shape { relation: String, reason: String },

    #[error("relation {name} already declared: {reason}")]
    RelationConflict { name: String, reason: String },

    /// Registry persistence failure (open, map, validate, write)
    #[error("registry: {0}")]
    Registry(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl GraphError {
    pub fn shape<R: Into<String>, S: Into<String>>(relation: R, reason: S) -> Self {
        Self::Shape {
            relation: relation.into(),
            reason: reason.into(),
        }
    }

    pub fn registry<S: Into<String>>(msg: S) -> Self {
        Self::Registry(msg.into())
    }

    /// True for the Missing-key family
    pub fn is_missing(&self) -> bool {
        matches!(
            self,
            GraphError::MissingNode(_)
                | GraphError::MissingNodeId(_)
                | GraphError::MissingRelation(_)
                | GraphError::MissingEdge { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphError::WeightType {
            relation: "distance".into(),
            expected: WeightType::Int64,
            found: WeightType::Float64,
        };
        assert_eq!(err.to_string(), "relation distance stores Int64 weights, got Float64");

        let err = GraphError::shape("friend", "adjacency relations take one source");
        assert_eq!(
            err.to_string(),
            "shape error in relation friend: adjacency relations take one source"
        );
    }

    #[test]
    fn test_missing_family() {
        assert!(GraphError::MissingNode("bob".into()).is_missing());
        assert!(GraphError::MissingNodeId(NodeId(3)).is_missing());

        let err = GraphError::MissingEdge { relation: "meeting".into(), edge: EdgeId(2) };
        assert!(err.is_missing());
        assert_eq!(err.to_string(), "relation meeting has no hyperedge #2");
        assert!(!GraphError::registry("mmap failed").is_missing());
    }
}
