//! Relations: named, typed edge collections stored as sparse matrices.
//!
//! A relation is in one of two modes, fixed at creation:
//!
//! - **Adjacency**: one matrix `A[source, destination] = weight`. At most
//!   one weight per pair; re-adding overwrites. Edges have no identity.
//! - **Incidence**: `A[source, edge] = true` and `B[edge, destination] = weight`.
//!   An edge id may carry several sources (column of `A`) and several
//!   destinations (row of `B`), which is what makes it a hyperedge.
//!
//! Answering "where does source `s` go" in incidence mode is a join of
//! `A[s, :]` against the rows of `B`. [`Relation::successors`] does that
//! join with [`crate::matrix::compose_row`], touching only stored entries.
//!
//! Relations deal in ids only. Name resolution and view construction
//! belong to [`crate::Graph`].

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::edge::{EdgeRecord, HyperedgeRecord, Record};
use crate::error::{GraphError, Result};
use crate::id::{EdgeId, Index, NodeId, NumericId, RelId};
use crate::matrix::{compose, compose_row, mxm, AnySecond, AnySecondI, Composition, SparseMatrix};
use crate::registry::IdentityRegistry;
use crate::weight::{Weight, WeightType};

/// Storage mode of a relation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Adjacency,
    Incidence,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Adjacency => f.write_str("Adjacency"),
            Mode::Incidence => f.write_str("Incidence"),
        }
    }
}

/// What the registry records about a relation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct RelationDescriptor {
    pub weight_type: WeightType,
    pub mode: Mode,
}

impl RelationDescriptor {
    pub fn new(weight_type: WeightType, mode: Mode) -> Self {
        Self { weight_type, mode }
    }
}

// ============================================================================
// ENDPOINTS
// ============================================================================

/// One side of an insertion: a single node, or (incidence only) several.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint<T = NodeId> {
    Single(T),
    Multiple(Vec<T>),
}

impl<T> Endpoint<T> {
    pub fn len(&self) -> usize {
        match self {
            Endpoint::Single(_) => 1,
            Endpoint::Multiple(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_single(&self) -> bool {
        matches!(self, Endpoint::Single(_))
    }

    pub fn as_slice(&self) -> &[T] {
        match self {
            Endpoint::Single(item) => std::slice::from_ref(item),
            Endpoint::Multiple(items) => items,
        }
    }

    pub fn try_map<U, E>(self, mut f: impl FnMut(T) -> std::result::Result<U, E>) -> std::result::Result<Endpoint<U>, E> {
        Ok(match self {
            Endpoint::Single(item) => Endpoint::Single(f(item)?),
            Endpoint::Multiple(items) => {
                Endpoint::Multiple(items.into_iter().map(f).collect::<std::result::Result<_, _>>()?)
            }
        })
    }
}

impl<T> From<T> for Endpoint<T> {
    fn from(item: T) -> Self {
        Endpoint::Single(item)
    }
}

impl<T> From<Vec<T>> for Endpoint<T> {
    fn from(items: Vec<T>) -> Self {
        Endpoint::Multiple(items)
    }
}

// ============================================================================
// STORAGE
// ============================================================================

/// The two representations behind one relation interface.
#[derive(Clone, Debug)]
pub enum RelationStorage {
    /// `A[source, destination] = weight`
    Adjacency(SparseMatrix<Weight>),
    /// `A[source, edge] = true`, `B[edge, destination] = weight`
    Incidence(SparseMatrix<bool>, SparseMatrix<Weight>),
}

impl RelationStorage {
    pub fn new(mode: Mode) -> Self {
        match mode {
            Mode::Adjacency => RelationStorage::Adjacency(SparseMatrix::hypersparse()),
            Mode::Incidence => {
                RelationStorage::Incidence(SparseMatrix::hypersparse(), SparseMatrix::hypersparse())
            }
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            RelationStorage::Adjacency(_) => Mode::Adjacency,
            RelationStorage::Incidence(..) => Mode::Incidence,
        }
    }
}

// ============================================================================
// RELATION
// ============================================================================

/// A named, typed edge collection.
#[derive(Clone, Debug)]
pub struct Relation {
    id: RelId,
    name: String,
    weight_type: WeightType,
    storage: RelationStorage,
}

impl Relation {
    pub fn new(id: RelId, name: impl Into<String>, weight_type: WeightType, mode: Mode) -> Self {
        Self {
            id,
            name: name.into(),
            weight_type,
            storage: RelationStorage::new(mode),
        }
    }

    pub fn id(&self) -> RelId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight_type(&self) -> WeightType {
        self.weight_type
    }

    pub fn mode(&self) -> Mode {
        self.storage.mode()
    }

    pub fn descriptor(&self) -> RelationDescriptor {
        RelationDescriptor::new(self.weight_type, self.mode())
    }

    pub fn storage(&self) -> &RelationStorage {
        &self.storage
    }

    /// Realized entries: stored pairs (adjacency) or `(edge, destination)`
    /// pairs of `B` (incidence).
    pub fn len(&self) -> usize {
        match &self.storage {
            RelationStorage::Adjacency(a) => a.nvals(),
            RelationStorage::Incidence(_, b) => b.nvals(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct edge ids (incidence) or pairs (adjacency)
    pub fn edge_count(&self) -> usize {
        match &self.storage {
            RelationStorage::Adjacency(a) => a.nvals(),
            RelationStorage::Incidence(_, b) => b.row_indices().count(),
        }
    }

    /// Check an insertion against the relation's weight type and mode
    /// without touching storage.
    pub fn validate<T>(
        &self,
        source: &Endpoint<T>,
        destination: &Endpoint<T>,
        weight: Option<&Weight>,
        edge: Option<EdgeId>,
    ) -> Result<()> {
        if let Some(weight) = weight {
            weight.check(&self.name, self.weight_type)?;
        }

        match self.mode() {
            Mode::Adjacency => {
                if !source.is_single() || !destination.is_single() {
                    return Err(GraphError::shape(
                        &self.name,
                        "adjacency relations take exactly one source and one destination",
                    ));
                }
                if edge.is_some() {
                    return Err(GraphError::shape(&self.name, "adjacency edges have no edge id"));
                }
            }
            Mode::Incidence => {
                if source.is_empty() || destination.is_empty() {
                    return Err(GraphError::shape(
                        &self.name,
                        "hyperedges need at least one source and one destination",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Missing-key error unless `edge` was allocated (below `next`) and is
    /// stored in this relation.
    pub fn check_edge(&self, edge: EdgeId, next: EdgeId) -> Result<()> {
        if edge < next && self.hyperedge(edge).is_some() {
            return Ok(());
        }
        Err(GraphError::MissingEdge {
            relation: self.name.clone(),
            edge,
        })
    }

    /// Insert an edge (adjacency) or hyperedge (incidence).
    ///
    /// In incidence mode a fresh edge id is drawn from `registry` unless
    /// `edge` names a hyperedge already stored here, in which case the
    /// endpoints are attached to it. Returns the edge id used (incidence only).
    ///
    /// Weights are converted to the relation's type when that is lossless.
    /// Both matrix writes are validated up front, so a returned error means
    /// nothing was written.
    pub fn add<R: IdentityRegistry + ?Sized>(
        &mut self,
        registry: &mut R,
        source: Endpoint,
        destination: Endpoint,
        weight: Option<Weight>,
        edge: Option<EdgeId>,
    ) -> Result<Option<EdgeId>> {
        self.validate(&source, &destination, weight.as_ref(), edge)?;
        if let Some(edge) = edge {
            self.check_edge(edge, registry.peek_edge_id()?)?;
        }
        let weight = match weight {
            Some(weight) => weight.coerce(&self.name, self.weight_type)?,
            None => self.weight_type.default_weight(),
        };

        match &mut self.storage {
            RelationStorage::Adjacency(a) => {
                let (Endpoint::Single(s), Endpoint::Single(d)) = (&source, &destination) else {
                    return Err(GraphError::shape(&self.name, "expected single endpoints"));
                };
                a.set(s.index(), d.index(), weight);
                trace!(relation = %self.name, source = s.0, destination = d.0, "add edge");
                Ok(None)
            }
            RelationStorage::Incidence(a, b) => {
                let edge = match edge {
                    Some(edge) => edge,
                    None => registry.new_edge_id()?,
                };
                for s in source.as_slice() {
                    a.set(s.index(), edge.index(), true);
                }
                for d in destination.as_slice() {
                    b.set(edge.index(), d.index(), weight);
                }
                trace!(
                    relation = %self.name,
                    edge = edge.0,
                    sources = source.len(),
                    destinations = destination.len(),
                    "add hyperedge"
                );
                Ok(Some(edge))
            }
        }
    }

    // ========================================================================
    // Pattern queries
    // ========================================================================

    /// Evaluate a `(source?, destination?)` pattern.
    ///
    /// Adjacency relations yield [`Record::Edge`]s; incidence relations yield
    /// one [`Record::Hyperedge`] per matching edge id, ascending by edge id
    /// for the bound-source / full cases and by `B` column order otherwise.
    pub fn query(
        &self,
        source: Option<NodeId>,
        destination: Option<NodeId>,
    ) -> Box<dyn Iterator<Item = Record> + '_> {
        let rid = self.id;
        match &self.storage {
            RelationStorage::Adjacency(a) => match (source, destination) {
                (Some(s), Some(d)) => Box::new(
                    a.get(s.index(), d.index())
                        .map(|_| Record::Edge(EdgeRecord::new(rid, s, d, None)))
                        .into_iter(),
                ),
                (Some(s), None) => Box::new(a.row(s.index()).map(move |(d, _)| {
                    Record::Edge(EdgeRecord::new(rid, s, NodeId(d), None))
                })),
                (None, Some(d)) => Box::new(a.col(d.index()).map(move |(s, _)| {
                    Record::Edge(EdgeRecord::new(rid, NodeId(s), d, None))
                })),
                (None, None) => Box::new(a.iter().map(move |(s, d, _)| {
                    Record::Edge(EdgeRecord::new(rid, NodeId(s), NodeId(d), None))
                })),
            },
            RelationStorage::Incidence(a, b) => {
                let edges: Box<dyn Iterator<Item = Index> + '_> = match (source, destination) {
                    // Edge ids leaving s that also reach d
                    (Some(s), Some(d)) => {
                        let shared = &a.row_pattern(s.index()) & &b.col_pattern(d.index());
                        Box::new(shared.into_iter())
                    }
                    (Some(s), None) => Box::new(a.row(s.index()).map(|(e, _)| e)),
                    (None, Some(d)) => Box::new(b.col(d.index()).map(|(e, _)| e)),
                    (None, None) => Box::new(b.row_indices()),
                };
                Box::new(edges.map(move |e| Record::Hyperedge(incidence_hyperedge(rid, a, b, e))))
            }
        }
    }

    /// Every record in the relation
    pub fn iter(&self) -> Box<dyn Iterator<Item = Record> + '_> {
        self.query(None, None)
    }

    /// The hyperedge stored under `edge`, if any (incidence only)
    pub fn hyperedge(&self, edge: EdgeId) -> Option<HyperedgeRecord> {
        match &self.storage {
            RelationStorage::Incidence(a, b) if b.row_len(edge.index()) > 0 => {
                Some(incidence_hyperedge(self.id, a, b, edge.index()))
            }
            _ => None,
        }
    }

    /// Flattened `(source, destination, edge, weight)` triples.
    ///
    /// For incidence relations this is the full composition of `A` and `B`:
    /// a hyperedge with m sources and n destinations contributes m·n triples.
    pub fn triples(&self) -> Box<dyn Iterator<Item = (NodeId, NodeId, Option<EdgeId>, Weight)> + '_> {
        match &self.storage {
            RelationStorage::Adjacency(a) => {
                Box::new(a.iter().map(|(s, d, w)| (NodeId(s), NodeId(d), None, *w)))
            }
            RelationStorage::Incidence(a, b) => Box::new(compose(a, b).map(|c| {
                (NodeId(c.row), NodeId(c.col), Some(EdgeId(c.shared)), *c.right)
            })),
        }
    }

    /// One-step successors of `source` as `(destination, edge, weight)`.
    ///
    /// Incidence relations join `A[source, :]` with `B`, ordered by edge id
    /// then destination; a destination reached through two hyperedges
    /// appears once per edge id.
    pub fn successors(
        &self,
        source: NodeId,
    ) -> Box<dyn Iterator<Item = (NodeId, Option<EdgeId>, Weight)> + '_> {
        match &self.storage {
            RelationStorage::Adjacency(a) => {
                Box::new(a.row(source.index()).map(|(d, w)| (NodeId(d), None, *w)))
            }
            RelationStorage::Incidence(a, b) => Box::new(
                compose_row(a, b, source.index())
                    .map(|c| (NodeId(c.col), Some(EdgeId(c.shared)), *c.right)),
            ),
        }
    }

    // ========================================================================
    // Weights
    // ========================================================================

    /// Stored weight of an edge.
    ///
    /// Adjacency looks up `A[source, destination]`; incidence looks up
    /// `B[edge, destination]` and requires `A[source, edge]`.
    pub fn weight(&self, source: NodeId, destination: NodeId, edge: Option<EdgeId>) -> Option<Weight> {
        match (&self.storage, edge) {
            (RelationStorage::Adjacency(a), None) => a.get(source.index(), destination.index()).copied(),
            (RelationStorage::Incidence(a, b), Some(edge)) => {
                if !a.contains(source.index(), edge.index()) {
                    return None;
                }
                b.get(edge.index(), destination.index()).copied()
            }
            _ => None,
        }
    }

    /// Weights of a hyperedge, in destination order
    pub fn hyperedge_weights(&self, edge: EdgeId) -> Vec<Weight> {
        match &self.storage {
            RelationStorage::Incidence(_, b) => b.row(edge.index()).map(|(_, w)| *w).collect(),
            RelationStorage::Adjacency(_) => Vec::new(),
        }
    }

    // ========================================================================
    // Projection
    // ========================================================================

    /// Source × destination weight matrix.
    ///
    /// Adjacency: a copy of `A`. Incidence: `A` composed with `B` under
    /// `any.second`; when several edge ids join the same pair, the weight of
    /// the lowest edge id is kept.
    pub fn project(&self) -> SparseMatrix<Weight> {
        match &self.storage {
            RelationStorage::Adjacency(a) => a.clone(),
            RelationStorage::Incidence(a, b) => mxm(a, b, &AnySecond),
        }
    }

    /// Source × destination matrix of (lowest) connecting edge ids.
    pub fn project_edge_ids(&self) -> Result<SparseMatrix<Index>> {
        self.project_with(&AnySecondI)
    }

    /// Compose the incidence pair under an arbitrary operator.
    pub fn project_with<C: Composition<bool, Weight>>(&self, op: &C) -> Result<SparseMatrix<C::Output>> {
        match &self.storage {
            RelationStorage::Incidence(a, b) => Ok(mxm(a, b, op)),
            RelationStorage::Adjacency(_) => Err(GraphError::shape(
                &self.name,
                "adjacency relations have no incidence pair to compose",
            )),
        }
    }

    // ========================================================================
    // Deletion
    // ========================================================================

    /// Remove everything matching `(source?, destination?)`.
    ///
    /// Adjacency removes the matched pairs. Incidence removes every matched
    /// hyperedge in full: all of its sources and destinations go, not only
    /// the matched sub-edge. Returns the number of edges (pairs or hyperedges)
    /// removed. Removed edge ids are not reused.
    pub fn remove(&mut self, source: Option<NodeId>, destination: Option<NodeId>) -> usize {
        let matched: Vec<Record> = self.query(source, destination).collect();
        let mut removed = 0;
        for record in matched {
            match (&mut self.storage, record) {
                (RelationStorage::Adjacency(a), Record::Edge(e)) => {
                    if a.remove(e.source.index(), e.destination.index()).is_some() {
                        removed += 1;
                    }
                }
                (RelationStorage::Incidence(a, b), Record::Hyperedge(h)) => {
                    a.remove_col(h.edge.index());
                    b.remove_row(h.edge.index());
                    removed += 1;
                }
                _ => {}
            }
        }
        trace!(relation = %self.name, removed, "remove");
        removed
    }

    /// Remove one hyperedge by id. Returns whether it existed.
    pub fn remove_edge(&mut self, edge: EdgeId) -> bool {
        match &mut self.storage {
            RelationStorage::Incidence(a, b) => {
                let sources = a.remove_col(edge.index());
                let destinations = b.remove_row(edge.index());
                !sources.is_empty() || !destinations.is_empty()
            }
            RelationStorage::Adjacency(_) => false,
        }
    }

    pub fn clear(&mut self) {
        match &mut self.storage {
            RelationStorage::Adjacency(a) => a.clear(),
            RelationStorage::Incidence(a, b) => {
                a.clear();
                b.clear();
            }
        }
    }
}

fn incidence_hyperedge(
    relation: RelId,
    a: &SparseMatrix<bool>,
    b: &SparseMatrix<Weight>,
    edge: Index,
) -> HyperedgeRecord {
    HyperedgeRecord {
        relation,
        sources: a.col(edge).map(|(s, _)| NodeId(s)).collect(),
        destinations: b.row(edge).map(|(d, _)| NodeId(d)).collect(),
        edge: EdgeId(edge),
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} {} {}:{}>", self.mode(), self.name, self.weight_type, self.len())
    }
}

// ============================================================================
// NAME RULES
// ============================================================================

/// Relation names are identifiers (`[A-Za-z_][A-Za-z0-9_]*`) that do not
/// start with `reserved_prefix`.
pub fn validate_name(name: &str, reserved_prefix: &str) -> Result<()> {
    let invalid = |reason: &str| GraphError::InvalidRelationName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let mut chars = name.chars();
    match chars.next() {
        None => return Err(invalid("name is empty")),
        Some(c) if !(c.is_ascii_alphabetic() || c == '_') => {
            return Err(invalid("must start with a letter or underscore"))
        }
        _ => {}
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid("must contain only letters, digits and underscores"));
    }
    if !reserved_prefix.is_empty() && name.starts_with(reserved_prefix) {
        return Err(invalid(&format!("prefix {:?} is reserved", reserved_prefix)));
    }
    Ok(())
}
