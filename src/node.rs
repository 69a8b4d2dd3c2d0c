//! Node handles and node references.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::error::Result;
use crate::graph::Graph;
use crate::id::NodeId;
use crate::registry::{Attrs, IdentityRegistry, MemoryRegistry};
use crate::relation::Endpoint;

/// How callers name a node: by name (resolved, or created on insert) or by id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Name(String),
    Id(NodeId),
}

impl From<&str> for NodeRef {
    fn from(name: &str) -> Self {
        NodeRef::Name(name.to_string())
    }
}

impl From<String> for NodeRef {
    fn from(name: String) -> Self {
        NodeRef::Name(name)
    }
}

impl From<&String> for NodeRef {
    fn from(name: &String) -> Self {
        NodeRef::Name(name.clone())
    }
}

impl From<NodeId> for NodeRef {
    fn from(id: NodeId) -> Self {
        NodeRef::Id(id)
    }
}

impl<R> From<Node<'_, R>> for NodeRef {
    fn from(node: Node<'_, R>) -> Self {
        NodeRef::Id(node.id)
    }
}

impl From<&str> for Endpoint<NodeRef> {
    fn from(name: &str) -> Self {
        Endpoint::Single(name.into())
    }
}

impl From<String> for Endpoint<NodeRef> {
    fn from(name: String) -> Self {
        Endpoint::Single(name.into())
    }
}

impl From<NodeId> for Endpoint<NodeRef> {
    fn from(id: NodeId) -> Self {
        Endpoint::Single(id.into())
    }
}

impl<R> From<Node<'_, R>> for Endpoint<NodeRef> {
    fn from(node: Node<'_, R>) -> Self {
        Endpoint::Single(node.into())
    }
}

impl From<Vec<&str>> for Endpoint<NodeRef> {
    fn from(names: Vec<&str>) -> Self {
        Endpoint::Multiple(names.into_iter().map(NodeRef::from).collect())
    }
}

impl From<&[&str]> for Endpoint<NodeRef> {
    fn from(names: &[&str]) -> Self {
        Endpoint::Multiple(names.iter().copied().map(NodeRef::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Endpoint<NodeRef> {
    fn from(names: [&str; N]) -> Self {
        Endpoint::Multiple(names.into_iter().map(NodeRef::from).collect())
    }
}

impl From<Vec<String>> for Endpoint<NodeRef> {
    fn from(names: Vec<String>) -> Self {
        Endpoint::Multiple(names.into_iter().map(NodeRef::from).collect())
    }
}

impl From<Vec<NodeId>> for Endpoint<NodeRef> {
    fn from(ids: Vec<NodeId>) -> Self {
        Endpoint::Multiple(ids.into_iter().map(NodeRef::from).collect())
    }
}

/// A node of a graph. Name and attributes are fetched on access.
pub struct Node<'g, R = MemoryRegistry> {
    graph: &'g Graph<R>,
    id: NodeId,
}

// Manual impls: the derives would demand `R: Clone`.
impl<R> Clone for Node<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Node<'_, R> {}

impl<'g, R: IdentityRegistry> Node<'g, R> {
    pub(crate) fn new(graph: &'g Graph<R>, id: NodeId) -> Self {
        Self { graph, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> Result<Rc<str>> {
        self.graph.node_name(self.id)
    }

    /// The node's property bag (empty when none was set)
    pub fn attrs(&self) -> Result<Attrs> {
        Ok(self.graph.registry().get_node_attrs(self.id)?.unwrap_or_default())
    }

    pub fn attr(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.attrs()?.remove(key))
    }
}

impl<R> PartialEq for Node<'_, R> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<R> Eq for Node<'_, R> {}

impl<R: IdentityRegistry> fmt::Display for Node<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Ok(name) => f.write_str(&name),
            Err(_) => write!(f, "{}", self.id),
        }
    }
}

impl<R> fmt::Debug for Node<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Node").field(&self.id).finish()
    }
}
