//! The graph: relations over one shared node space.
//!
//! A [`Graph`] owns its identity registry, the name cache in front of it, and
//! every [`Relation`] keyed by id in registration order. Queries are
//! three-field [`Pattern`]s; each field may be bound or a wildcard.
//!
//! # Dispatch
//!
//! | source | relation | destination | evaluation                                |
//! |--------|----------|-------------|-------------------------------------------|
//! | s      | r        | d           | point/probe query on `r`                  |
//! | s      | r        | *           | row slice of `r`                          |
//! | s      | *        | d           | point/probe query on every relation       |
//! | s      | *        | *           | row slice of every relation               |
//! | *      | r        | d           | column slice of `r`                       |
//! | *      | r        | *           | full iteration of `r`                     |
//! | *      | *        | d           | column slice of every relation            |
//! | *      | *        | *           | full iteration of every relation          |
//!
//! When the relation is bound, every bound name must resolve or the query
//! fails with a Missing-key error. When the relation is a wildcard the query
//! fans out, and a name that does not resolve simply matches nothing.

use std::collections::HashMap;
use std::fmt;
use std::iter;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::cache::NameCache;
use crate::config::GraphConfig;
use crate::edge::{Record, View};
use crate::error::{GraphError, Result};
use crate::id::{EdgeId, NodeId, RelId};
use crate::node::{Node, NodeRef};
use crate::registry::{Attrs, IdentityRegistry, MemoryRegistry};
use crate::relation::{validate_name, Endpoint, Mode, Relation, RelationDescriptor};
use crate::weight::{Weight, WeightType};

// ============================================================================
// PATTERNS
// ============================================================================

/// A `(relation?, source?, destination?)` query. `None` is a wildcard.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Pattern {
    pub relation: Option<String>,
    pub source: Option<NodeRef>,
    pub destination: Option<NodeRef>,
}

impl Pattern {
    /// All wildcards
    pub fn any() -> Self {
        Self::default()
    }

    pub fn relation(mut self, name: impl Into<String>) -> Self {
        self.relation = Some(name.into());
        self
    }

    pub fn source(mut self, node: impl Into<NodeRef>) -> Self {
        self.source = Some(node.into());
        self
    }

    pub fn destination(mut self, node: impl Into<NodeRef>) -> Self {
        self.destination = Some(node.into());
        self
    }

    /// Dispatch case number, 1 (all bound) through 8 (all wildcards)
    pub fn case(&self) -> u8 {
        1 + u8::from(self.source.is_none()) * 4
            + u8::from(self.relation.is_none()) * 2
            + u8::from(self.destination.is_none())
    }
}

/// A pattern with its names resolved to ids
#[derive(Clone, Copy, Debug)]
struct Resolved {
    relation: Option<RelId>,
    source: Option<NodeId>,
    destination: Option<NodeId>,
}

// ============================================================================
// QUERY RESULTS
// ============================================================================

/// Lazy query results, in relation-registration order.
pub struct Query<'g, R = MemoryRegistry> {
    graph: &'g Graph<R>,
    records: Box<dyn Iterator<Item = Record> + 'g>,
}

impl<'g, R: IdentityRegistry> Query<'g, R> {
    fn new(graph: &'g Graph<R>, records: Box<dyn Iterator<Item = Record> + 'g>) -> Self {
        Self { graph, records }
    }

    fn empty(graph: &'g Graph<R>) -> Self {
        Self::new(graph, Box::new(iter::empty()))
    }

    /// The raw id records, skipping view construction
    pub fn records(self) -> Box<dyn Iterator<Item = Record> + 'g> {
        self.records
    }
}

impl<'g, R> std::fmt::Debug for Query<'g, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query").finish_non_exhaustive()
    }
}

impl<'g, R: IdentityRegistry> Iterator for Query<'g, R> {
    type Item = View<'g, R>;

    fn next(&mut self) -> Option<Self::Item> {
        let graph = self.graph;
        self.records.next().map(|record| View::new(graph, record))
    }
}

// ============================================================================
// INGESTION
// ============================================================================

/// One row of bulk input: `(relation, source, destination[, weight])`.
#[derive(Clone, Debug, PartialEq)]
pub struct IngestRow {
    pub relation: String,
    pub source: Endpoint<NodeRef>,
    pub destination: Endpoint<NodeRef>,
    pub weight: Option<Weight>,
}

impl<N, S, D> From<(N, S, D)> for IngestRow
where
    N: Into<String>,
    S: Into<Endpoint<NodeRef>>,
    D: Into<Endpoint<NodeRef>>,
{
    fn from((relation, source, destination): (N, S, D)) -> Self {
        Self {
            relation: relation.into(),
            source: source.into(),
            destination: destination.into(),
            weight: None,
        }
    }
}

impl<N, S, D, W> From<(N, S, D, W)> for IngestRow
where
    N: Into<String>,
    S: Into<Endpoint<NodeRef>>,
    D: Into<Endpoint<NodeRef>>,
    W: Into<Weight>,
{
    fn from((relation, source, destination, weight): (N, S, D, W)) -> Self {
        Self {
            relation: relation.into(),
            source: source.into(),
            destination: destination.into(),
            weight: Some(weight.into()),
        }
    }
}

// ============================================================================
// GRAPH
// ============================================================================

pub struct Graph<R = MemoryRegistry> {
    registry: R,
    cache: NameCache,
    /// Registration order
    relations: IndexMap<RelId, Relation>,
    relation_names: HashMap<String, RelId>,
    config: GraphConfig,
}

impl Graph<MemoryRegistry> {
    /// An empty graph with an in-memory registry and default configuration
    pub fn new() -> Self {
        Self {
            registry: MemoryRegistry::new(),
            cache: NameCache::new(),
            relations: IndexMap::new(),
            relation_names: HashMap::new(),
            config: GraphConfig::default(),
        }
    }

    /// Open a graph as configured. With a `registry_path`, the registry is
    /// loaded from (and later saved to) that file; relations recorded there
    /// are declared again, empty.
    pub fn open(config: GraphConfig) -> Result<Self> {
        let registry = match &config.registry_path {
            Some(path) => MemoryRegistry::load(path)?,
            None => MemoryRegistry::new(),
        };
        Self::with_registry(registry, config)
    }

    /// Persist the registry now
    pub fn save(&mut self) -> Result<()> {
        self.registry.save()
    }
}

impl Default for Graph<MemoryRegistry> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: IdentityRegistry> Graph<R> {
    /// Build a graph over an existing registry, re-creating every relation it
    /// has recorded.
    pub fn with_registry(registry: R, config: GraphConfig) -> Result<Self> {
        let mut relations = IndexMap::new();
        let mut relation_names = HashMap::new();
        for (id, name, desc) in registry.relations()? {
            relations.insert(id, Relation::new(id, name.as_str(), desc.weight_type, desc.mode));
            relation_names.insert(name, id);
        }
        debug!(relations = relations.len(), "graph opened");
        Ok(Self {
            registry,
            cache: NameCache::new(),
            relations,
            relation_names,
            config,
        })
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    // ========================================================================
    // Relations
    // ========================================================================

    /// Declare a relation. Redeclaring with the same weight type and mode
    /// returns the existing id; anything else is a conflict.
    pub fn add_relation(&mut self, name: &str, weight_type: WeightType, mode: Mode) -> Result<RelId> {
        let descriptor = RelationDescriptor::new(weight_type, mode);
        if let Some(&id) = self.relation_names.get(name) {
            let existing = self.relations.get(&id).map(Relation::descriptor);
            return match existing {
                Some(existing) if existing == descriptor => Ok(id),
                Some(existing) => Err(GraphError::RelationConflict {
                    name: name.to_string(),
                    reason: format!(
                        "declared as {} {}, redeclared as {} {}",
                        existing.mode, existing.weight_type, mode, weight_type
                    ),
                }),
                None => Err(GraphError::MissingRelation(name.to_string())),
            };
        }

        validate_name(name, &self.config.reserved_prefix)?;
        let id = self.registry.upsert_relation(name, descriptor)?;
        self.relations.insert(id, Relation::new(id, name, weight_type, mode));
        self.relation_names.insert(name.to_string(), id);
        debug!(relation = name, id = id.0, %mode, %weight_type, "declared relation");
        Ok(id)
    }

    pub fn relation(&self, name: &str) -> Result<&Relation> {
        self.relation_names
            .get(name)
            .and_then(|id| self.relations.get(id))
            .ok_or_else(|| GraphError::MissingRelation(name.to_string()))
    }

    pub fn relation_by_id(&self, id: RelId) -> Option<&Relation> {
        self.relations.get(&id)
    }

    pub fn relation_id(&self, name: &str) -> Option<RelId> {
        self.relation_names.get(name).copied()
    }

    /// Relations in registration order
    pub fn relations(&self) -> impl Iterator<Item = &Relation> + '_ {
        self.relations.values()
    }

    pub fn relation_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.relations.values().map(Relation::name)
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Get or create a node, merging `attrs` into its property bag.
    pub fn upsert_node(&mut self, name: &str, attrs: Option<Attrs>) -> Result<NodeId> {
        let id = self.intern(name)?;
        if let Some(attrs) = attrs {
            self.registry.set_node_attrs(id, attrs)?;
        }
        Ok(id)
    }

    pub fn node(&self, name: &str) -> Result<Node<'_, R>> {
        Ok(Node::new(self, self.node_id(name)?))
    }

    pub fn node_id(&self, name: &str) -> Result<NodeId> {
        self.lookup_name(name)?
            .ok_or_else(|| GraphError::MissingNode(name.to_string()))
    }

    pub fn node_name(&self, id: NodeId) -> Result<Rc<str>> {
        let registry = &self.registry;
        self.cache
            .node_name(id, |id| registry.get_node_name(id))?
            .ok_or(GraphError::MissingNodeId(id))
    }

    fn lookup_name(&self, name: &str) -> Result<Option<NodeId>> {
        let registry = &self.registry;
        self.cache.node_id(name, |name| registry.get_node_id(name))
    }

    fn lookup(&self, node: &NodeRef) -> Result<Option<NodeId>> {
        match node {
            NodeRef::Name(name) => self.lookup_name(name),
            NodeRef::Id(id) => match self.node_name(*id) {
                Ok(_) => Ok(Some(*id)),
                Err(GraphError::MissingNodeId(_)) => Ok(None),
                Err(e) => Err(e),
            },
        }
    }

    fn require(&self, node: &NodeRef) -> Result<NodeId> {
        self.lookup(node)?.ok_or_else(|| match node {
            NodeRef::Name(name) => GraphError::MissingNode(name.clone()),
            NodeRef::Id(id) => GraphError::MissingNodeId(*id),
        })
    }

    fn intern(&mut self, name: &str) -> Result<NodeId> {
        if let Some(id) = self.lookup_name(name)? {
            return Ok(id);
        }
        let id = self.registry.upsert_node(name)?;
        self.cache.insert(name, id);
        Ok(id)
    }

    /// Resolve an endpoint for insertion: names are created, ids must exist.
    fn intern_ref(&mut self, node: NodeRef) -> Result<NodeId> {
        match node {
            NodeRef::Name(name) => self.intern(&name),
            NodeRef::Id(id) => {
                self.node_name(id)?;
                Ok(id)
            }
        }
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    /// Add an unweighted edge (the relation's default weight).
    ///
    /// Creates the relation on first use. Returns the edge id for incidence
    /// relations.
    pub fn add(
        &mut self,
        relation: &str,
        source: impl Into<Endpoint<NodeRef>>,
        destination: impl Into<Endpoint<NodeRef>>,
    ) -> Result<Option<EdgeId>> {
        self.insert(relation, source.into(), destination.into(), None, None)
    }

    pub fn add_weighted(
        &mut self,
        relation: &str,
        source: impl Into<Endpoint<NodeRef>>,
        destination: impl Into<Endpoint<NodeRef>>,
        weight: impl Into<Weight>,
    ) -> Result<Option<EdgeId>> {
        self.insert(relation, source.into(), destination.into(), Some(weight.into()), None)
    }

    /// Add a hyperedge under a fresh edge id, creating an incidence relation
    /// on first use.
    pub fn add_hyperedge(
        &mut self,
        relation: &str,
        sources: impl Into<Endpoint<NodeRef>>,
        destinations: impl Into<Endpoint<NodeRef>>,
        weight: Option<Weight>,
    ) -> Result<EdgeId> {
        if let Ok(existing) = self.relation(relation) {
            if existing.mode() != Mode::Incidence {
                return Err(GraphError::shape(relation, "hyperedges need an incidence relation"));
            }
        }
        self.insert_as(relation, Mode::Incidence, sources.into(), destinations.into(), weight, None)?
            .ok_or_else(|| GraphError::shape(relation, "no edge id allocated"))
    }

    /// The general insertion entry point.
    ///
    /// With `edge` set (incidence only) the endpoints join that hyperedge
    /// instead of a new one; the id must already be stored in `relation`.
    /// Nothing is declared or written unless every check passes.
    pub fn insert(
        &mut self,
        relation: &str,
        source: Endpoint<NodeRef>,
        destination: Endpoint<NodeRef>,
        weight: Option<Weight>,
        edge: Option<EdgeId>,
    ) -> Result<Option<EdgeId>> {
        let multi = !source.is_single() || !destination.is_single() || edge.is_some();
        let mode = if multi { Mode::Incidence } else { self.config.default_mode };
        self.insert_as(relation, mode, source, destination, weight, edge)
    }

    /// Insert into `relation`, declaring it with `mode` if it is new.
    fn insert_as(
        &mut self,
        relation: &str,
        mode: Mode,
        source: Endpoint<NodeRef>,
        destination: Endpoint<NodeRef>,
        weight: Option<Weight>,
        edge: Option<EdgeId>,
    ) -> Result<Option<EdgeId>> {
        let weight_type = weight.map_or(self.config.default_weight_type, |w| w.weight_type());
        self.check_insert(
            relation,
            weight_type,
            mode,
            &source,
            &destination,
            weight.as_ref(),
            edge,
        )?;
        let rid = self.declare_implicit(relation, weight_type, mode)?;

        let source = source.try_map(|node| self.intern_ref(node))?;
        let destination = destination.try_map(|node| self.intern_ref(node))?;

        let target = self
            .relations
            .get_mut(&rid)
            .ok_or_else(|| GraphError::MissingRelation(relation.to_string()))?;
        target.add(&mut self.registry, source, destination, weight, edge)
    }

    /// Every check an insertion can fail, run against the existing relation
    /// or the one it would declare. Has no effects.
    #[allow(clippy::too_many_arguments)]
    fn check_insert(
        &self,
        relation: &str,
        weight_type: WeightType,
        mode: Mode,
        source: &Endpoint<NodeRef>,
        destination: &Endpoint<NodeRef>,
        weight: Option<&Weight>,
        edge: Option<EdgeId>,
    ) -> Result<()> {
        let pending;
        let target = match self.relation(relation) {
            Ok(existing) => existing,
            Err(_) => {
                validate_name(relation, &self.config.reserved_prefix)?;
                pending = Relation::new(RelId(0), relation, weight_type, mode);
                &pending
            }
        };

        target.validate(source, destination, weight, edge)?;
        if let Some(edge) = edge {
            target.check_edge(edge, self.registry.peek_edge_id()?)?;
        }
        // Names are created on insert; ids must already exist
        for node in source.as_slice().iter().chain(destination.as_slice()) {
            if let NodeRef::Id(_) = node {
                self.require(node)?;
            }
        }
        Ok(())
    }

    /// Existing relation id, or declare the relation with the given shape
    fn declare_implicit(&mut self, name: &str, weight_type: WeightType, mode: Mode) -> Result<RelId> {
        match self.relation_names.get(name) {
            Some(&id) => Ok(id),
            None => self.add_relation(name, weight_type, mode),
        }
    }

    /// Fold rows through [`Graph::insert`], stopping at the first error.
    /// Returns the number of rows applied.
    pub fn ingest<I>(&mut self, rows: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: Into<IngestRow>,
    {
        let mut applied = 0;
        for row in rows {
            let row = row.into();
            self.insert(&row.relation, row.source, row.destination, row.weight, None)?;
            applied += 1;
        }
        debug!(rows = applied, "ingested");
        Ok(applied)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Resolve a pattern's names. `Ok(None)` means a fan-out pattern named a
    /// node that does not exist, so nothing can match.
    fn resolve(&self, pattern: &Pattern) -> Result<Option<Resolved>> {
        match &pattern.relation {
            Some(name) => {
                let relation = self.relation(name)?.id();
                let source = pattern.source.as_ref().map(|n| self.require(n)).transpose()?;
                let destination = pattern.destination.as_ref().map(|n| self.require(n)).transpose()?;
                Ok(Some(Resolved {
                    relation: Some(relation),
                    source,
                    destination,
                }))
            }
            None => {
                let resolve = |node: &Option<NodeRef>| -> Result<Option<Option<NodeId>>> {
                    match node {
                        Some(node) => Ok(self.lookup(node)?.map(Some)),
                        None => Ok(Some(None)),
                    }
                };
                let Some(source) = resolve(&pattern.source)? else {
                    return Ok(None);
                };
                let Some(destination) = resolve(&pattern.destination)? else {
                    return Ok(None);
                };
                Ok(Some(Resolved {
                    relation: None,
                    source,
                    destination,
                }))
            }
        }
    }

    /// Evaluate a pattern. See the module docs for the eight cases.
    pub fn query(&self, pattern: &Pattern) -> Result<Query<'_, R>> {
        let case = pattern.case();
        let Some(resolved) = self.resolve(pattern)? else {
            trace!(case, "query: unresolved node in fan-out, empty result");
            return Ok(Query::empty(self));
        };
        trace!(
            case,
            relation = ?resolved.relation,
            source = ?resolved.source,
            destination = ?resolved.destination,
            "query"
        );

        let Resolved {
            relation,
            source,
            destination,
        } = resolved;
        let records: Box<dyn Iterator<Item = Record> + '_> = match relation {
            Some(rid) => match self.relations.get(&rid) {
                Some(relation) => relation.query(source, destination),
                None => Box::new(iter::empty()),
            },
            None => Box::new(
                self.relations
                    .values()
                    .flat_map(move |relation| relation.query(source, destination)),
            ),
        };
        Ok(Query::new(self, records))
    }

    /// Every edge and hyperedge of the graph
    pub fn iter(&self) -> Query<'_, R> {
        let records = self.relations.values().flat_map(Relation::iter);
        Query::new(self, Box::new(records))
    }

    /// Sum of the relation lengths
    pub fn len(&self) -> usize {
        self.relations.values().map(Relation::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ========================================================================
    // Deletion
    // ========================================================================

    /// Remove what `pattern` matches, resolving names as [`Graph::query`]
    /// does. Returns the number of edges (pairs or hyperedges) removed.
    pub fn remove(&mut self, pattern: &Pattern) -> Result<usize> {
        let Some(Resolved {
            relation,
            source,
            destination,
        }) = self.resolve(pattern)?
        else {
            return Ok(0);
        };
        let removed = match relation {
            Some(rid) => self
                .relations
                .get_mut(&rid)
                .map_or(0, |r| r.remove(source, destination)),
            None => self
                .relations
                .values_mut()
                .map(|r| r.remove(source, destination))
                .sum(),
        };
        debug!(case = pattern.case(), removed, "removed");
        Ok(removed)
    }

    /// Drop every edge, keeping relations, nodes, and the edge counter
    pub fn clear(&mut self) {
        for relation in self.relations.values_mut() {
            relation.clear();
        }
    }
}

impl<R: IdentityRegistry> fmt::Display for Graph<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.relation_names().collect();
        write!(f, "<Graph [{}]: {}>", names.join(", "), self.len())
    }
}

impl<R> fmt::Debug for Graph<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("relations", &self.relations.values().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_case_numbers() {
        assert_eq!(Pattern::any().source("s").relation("r").destination("d").case(), 1);
        assert_eq!(Pattern::any().source("s").relation("r").case(), 2);
        assert_eq!(Pattern::any().source("s").destination("d").case(), 3);
        assert_eq!(Pattern::any().source("s").case(), 4);
        assert_eq!(Pattern::any().relation("r").destination("d").case(), 5);
        assert_eq!(Pattern::any().relation("r").case(), 6);
        assert_eq!(Pattern::any().destination("d").case(), 7);
        assert_eq!(Pattern::any().case(), 8);
    }

    #[test]
    fn test_ingest_row_from_tuples() {
        let row: IngestRow = ("distance", "chicago", "seattle", 422).into();
        assert_eq!(row.relation, "distance");
        assert_eq!(row.weight, Some(Weight::Int64(422)));

        let row: IngestRow = ("friend".to_string(), "bob".to_string(), "alice".to_string()).into();
        assert_eq!(row.source, Endpoint::Single(NodeRef::from("bob")));
        assert_eq!(row.weight, None);
    }

    #[test]
    fn test_failed_insert_creates_no_nodes() {
        let mut g = Graph::new();
        g.add_relation("distance", WeightType::Int64, Mode::Adjacency).unwrap();
        let err = g.add_weighted("distance", "a", "b", 1.5).unwrap_err();
        assert!(matches!(err, GraphError::WeightType { .. }));
        assert_eq!(g.registry().node_count(), 0);
    }
}
