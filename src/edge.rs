//! Edge and hyperedge records and the lazy views built on them.
//!
//! Relations produce *records*: plain id tuples that order and compare
//! structurally over `(relation, source(s), destination(s), edge)`.
//! The graph wraps each record in a *view* holding a reference back to the
//! graph. Names and weights are looked up only when a view is asked for
//! them (or rendered), so bulk iteration never touches the registry.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::error::Result;
use crate::graph::Graph;
use crate::id::{EdgeId, NodeId, RelId};
use crate::node::Node;
use crate::registry::{IdentityRegistry, MemoryRegistry};
use crate::relation::Relation;
use crate::weight::Weight;

// ============================================================================
// RECORDS
// ============================================================================

/// A single source → destination edge
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeRecord {
    pub relation: RelId,
    pub source: NodeId,
    pub destination: NodeId,
    /// Present for edges of incidence relations
    pub edge: Option<EdgeId>,
}

impl EdgeRecord {
    pub fn new(relation: RelId, source: NodeId, destination: NodeId, edge: Option<EdgeId>) -> Self {
        Self {
            relation,
            source,
            destination,
            edge,
        }
    }
}

/// A hyperedge: every source and destination sharing one edge id.
/// Sources and destinations are ascending by node id.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HyperedgeRecord {
    pub relation: RelId,
    pub sources: Vec<NodeId>,
    pub destinations: Vec<NodeId>,
    pub edge: EdgeId,
}

impl HyperedgeRecord {
    /// One edge record per (source, destination) pair
    pub fn edges(&self) -> impl Iterator<Item = EdgeRecord> + '_ {
        self.sources.iter().flat_map(move |&s| {
            self.destinations
                .iter()
                .map(move |&d| EdgeRecord::new(self.relation, s, d, Some(self.edge)))
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Record {
    Edge(EdgeRecord),
    Hyperedge(HyperedgeRecord),
}

impl Record {
    pub fn relation(&self) -> RelId {
        match self {
            Record::Edge(e) => e.relation,
            Record::Hyperedge(h) => h.relation,
        }
    }

    pub fn edge_id(&self) -> Option<EdgeId> {
        match self {
            Record::Edge(e) => e.edge,
            Record::Hyperedge(h) => Some(h.edge),
        }
    }
}

// ============================================================================
// VIEWS
// ============================================================================

/// Render a node for display: its name, or `#id` when unresolvable
fn display_node<R: IdentityRegistry>(graph: &Graph<R>, id: NodeId) -> String {
    match graph.node_name(id) {
        Ok(name) => name.to_string(),
        Err(_) => id.to_string(),
    }
}

fn display_relation<R: IdentityRegistry>(graph: &Graph<R>, id: RelId) -> String {
    graph
        .relation_by_id(id)
        .map(|r| r.name().to_string())
        .unwrap_or_else(|| id.to_string())
}

/// Lazy view of one edge
pub struct Edge<'g, R = MemoryRegistry> {
    graph: &'g Graph<R>,
    record: EdgeRecord,
}

impl<'g, R: IdentityRegistry> Edge<'g, R> {
    pub(crate) fn new(graph: &'g Graph<R>, record: EdgeRecord) -> Self {
        Self { graph, record }
    }

    pub fn record(&self) -> &EdgeRecord {
        &self.record
    }

    pub fn into_record(self) -> EdgeRecord {
        self.record
    }

    pub fn relation_id(&self) -> RelId {
        self.record.relation
    }

    pub fn relation(&self) -> Option<&'g Relation> {
        self.graph.relation_by_id(self.record.relation)
    }

    pub fn edge_id(&self) -> Option<EdgeId> {
        self.record.edge
    }

    pub fn source_id(&self) -> NodeId {
        self.record.source
    }

    pub fn destination_id(&self) -> NodeId {
        self.record.destination
    }

    pub fn source(&self) -> Node<'g, R> {
        Node::new(self.graph, self.record.source)
    }

    pub fn destination(&self) -> Node<'g, R> {
        Node::new(self.graph, self.record.destination)
    }

    pub fn source_name(&self) -> Result<Rc<str>> {
        self.graph.node_name(self.record.source)
    }

    pub fn destination_name(&self) -> Result<Rc<str>> {
        self.graph.node_name(self.record.destination)
    }

    /// Current stored weight, looked up in the relation's matrix
    pub fn weight(&self) -> Option<Weight> {
        self.relation()?
            .weight(self.record.source, self.record.destination, self.record.edge)
    }
}

impl<R: IdentityRegistry> fmt::Display for Edge<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}, {}",
            display_relation(self.graph, self.record.relation),
            display_node(self.graph, self.record.source),
            display_node(self.graph, self.record.destination),
        )?;
        // Plain `true` edges render without a weight
        match self.weight() {
            Some(Weight::Bool(true)) | None => f.write_str(")"),
            Some(w) => write!(f, ", {})", w),
        }
    }
}

impl<R> fmt::Debug for Edge<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Edge").field(&self.record).finish()
    }
}

/// Lazy view of one hyperedge
pub struct Hyperedge<'g, R = MemoryRegistry> {
    graph: &'g Graph<R>,
    record: HyperedgeRecord,
}

impl<'g, R: IdentityRegistry> Hyperedge<'g, R> {
    pub(crate) fn new(graph: &'g Graph<R>, record: HyperedgeRecord) -> Self {
        Self { graph, record }
    }

    pub fn record(&self) -> &HyperedgeRecord {
        &self.record
    }

    pub fn into_record(self) -> HyperedgeRecord {
        self.record
    }

    pub fn relation_id(&self) -> RelId {
        self.record.relation
    }

    pub fn relation(&self) -> Option<&'g Relation> {
        self.graph.relation_by_id(self.record.relation)
    }

    pub fn edge_id(&self) -> EdgeId {
        self.record.edge
    }

    pub fn source_ids(&self) -> &[NodeId] {
        &self.record.sources
    }

    pub fn destination_ids(&self) -> &[NodeId] {
        &self.record.destinations
    }

    pub fn sources(&self) -> impl Iterator<Item = Node<'g, R>> + '_ {
        let graph = self.graph;
        self.record.sources.iter().map(move |&id| Node::new(graph, id))
    }

    pub fn destinations(&self) -> impl Iterator<Item = Node<'g, R>> + '_ {
        let graph = self.graph;
        self.record.destinations.iter().map(move |&id| Node::new(graph, id))
    }

    pub fn source_names(&self) -> Result<Vec<Rc<str>>> {
        self.record.sources.iter().map(|&id| self.graph.node_name(id)).collect()
    }

    pub fn destination_names(&self) -> Result<Vec<Rc<str>>> {
        self.record.destinations.iter().map(|&id| self.graph.node_name(id)).collect()
    }

    /// Weights in destination order, looked up in the relation's `B` matrix
    pub fn weights(&self) -> Vec<Weight> {
        self.relation()
            .map(|r| r.hyperedge_weights(self.record.edge))
            .unwrap_or_default()
    }

    /// Flatten into one edge per (source, destination) pair
    pub fn edges(&self) -> impl Iterator<Item = Edge<'g, R>> + '_ {
        let graph = self.graph;
        self.record.edges().map(move |record| Edge::new(graph, record))
    }
}

impl<R: IdentityRegistry> fmt::Display for Hyperedge<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |ids: &[NodeId]| {
            ids.iter()
                .map(|&id| display_node(self.graph, id))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let weights = self
            .weights()
            .iter()
            .map(Weight::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "{}(({}), ({}), ({}))",
            display_relation(self.graph, self.record.relation),
            join(&self.record.sources),
            join(&self.record.destinations),
            weights
        )
    }
}

impl<R> fmt::Debug for Hyperedge<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hyperedge").field(&self.record).finish()
    }
}

/// A query result: an edge of an adjacency relation or a hyperedge of an
/// incidence relation.
pub enum View<'g, R = MemoryRegistry> {
    Edge(Edge<'g, R>),
    Hyperedge(Hyperedge<'g, R>),
}

impl<'g, R: IdentityRegistry> View<'g, R> {
    pub(crate) fn new(graph: &'g Graph<R>, record: Record) -> Self {
        match record {
            Record::Edge(e) => View::Edge(Edge::new(graph, e)),
            Record::Hyperedge(h) => View::Hyperedge(Hyperedge::new(graph, h)),
        }
    }

    pub fn relation_id(&self) -> RelId {
        match self {
            View::Edge(e) => e.relation_id(),
            View::Hyperedge(h) => h.relation_id(),
        }
    }

    pub fn edge_id(&self) -> Option<EdgeId> {
        match self {
            View::Edge(e) => e.edge_id(),
            View::Hyperedge(h) => Some(h.edge_id()),
        }
    }

    pub fn as_edge(&self) -> Option<&Edge<'g, R>> {
        match self {
            View::Edge(e) => Some(e),
            View::Hyperedge(_) => None,
        }
    }

    pub fn as_hyperedge(&self) -> Option<&Hyperedge<'g, R>> {
        match self {
            View::Hyperedge(h) => Some(h),
            View::Edge(_) => None,
        }
    }

    /// Flatten into plain edges
    pub fn edges(&self) -> Vec<Edge<'g, R>> {
        match self {
            View::Edge(e) => vec![Edge::new(e.graph, e.record.clone())],
            View::Hyperedge(h) => h.edges().collect(),
        }
    }

    pub fn record(&self) -> Record {
        match self {
            View::Edge(e) => Record::Edge(e.record.clone()),
            View::Hyperedge(h) => Record::Hyperedge(h.record.clone()),
        }
    }
}

impl<R: IdentityRegistry> fmt::Display for View<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Edge(e) => fmt::Display::fmt(e, f),
            View::Hyperedge(h) => fmt::Display::fmt(h, f),
        }
    }
}

impl<R> fmt::Debug for View<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Edge(e) => fmt::Debug::fmt(e, f),
            View::Hyperedge(h) => fmt::Debug::fmt(h, f),
        }
    }
}

// Structural equality and ordering: the graph reference does not take part.

macro_rules! structural_traits {
    ($view:ident, $key:ident) => {
        impl<R> PartialEq for $view<'_, R> {
            fn eq(&self, other: &Self) -> bool {
                self.$key == other.$key
            }
        }

        impl<R> Eq for $view<'_, R> {}

        impl<R> PartialOrd for $view<'_, R> {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl<R> Ord for $view<'_, R> {
            fn cmp(&self, other: &Self) -> Ordering {
                self.$key.cmp(&other.$key)
            }
        }

        impl<R> Hash for $view<'_, R> {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.$key.hash(state)
            }
        }
    };
}

structural_traits!(Edge, record);
structural_traits!(Hyperedge, record);

impl<R> View<'_, R> {
    fn key(&self) -> (u8, Option<&EdgeRecord>, Option<&HyperedgeRecord>) {
        match self {
            View::Edge(e) => (0, Some(&e.record), None),
            View::Hyperedge(h) => (1, None, Some(&h.record)),
        }
    }
}

impl<R> PartialEq for View<'_, R> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<R> Eq for View<'_, R> {}

impl<R> PartialOrd for View<'_, R> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<R> Ord for View<'_, R> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Relation first, so mixed results sort by relation id
        let rel = |v: &Self| match v {
            View::Edge(e) => e.record.relation,
            View::Hyperedge(h) => h.record.relation,
        };
        rel(self).cmp(&rel(other)).then_with(|| self.key().cmp(&other.key()))
    }
}

impl<R> Hash for View<'_, R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hyperedge_record_flattens_to_pairs() {
        let h = HyperedgeRecord {
            relation: RelId(2),
            sources: vec![NodeId(0), NodeId(1)],
            destinations: vec![NodeId(5)],
            edge: EdgeId(9),
        };
        let pairs: Vec<_> = h.edges().map(|e| (e.source, e.destination, e.edge)).collect();
        assert_eq!(
            pairs,
            vec![
                (NodeId(0), NodeId(5), Some(EdgeId(9))),
                (NodeId(1), NodeId(5), Some(EdgeId(9))),
            ]
        );
    }

    #[test]
    fn test_records_order_structurally() {
        let a = EdgeRecord::new(RelId(0), NodeId(3), NodeId(1), None);
        let b = EdgeRecord::new(RelId(0), NodeId(3), NodeId(2), None);
        let c = EdgeRecord::new(RelId(1), NodeId(0), NodeId(0), None);
        assert!(a < b && b < c);
        assert_eq!(Record::Edge(a.clone()).relation(), RelId(0));
        assert_eq!(Record::Edge(a).edge_id(), None);
    }
}
