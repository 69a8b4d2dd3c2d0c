//! Unit tests for relation storage and the pattern evaluator

use graphony::{
    EdgeId, Endpoint, IdentityRegistry, MemoryRegistry, Mode, NodeId, Record, RelId, Relation,
    RelationStorage, Weight, WeightType,
};

/// Helper to create NodeId from integer
fn node(n: u64) -> NodeId {
    NodeId(n)
}

fn incidence(weight_type: WeightType) -> (Relation, MemoryRegistry) {
    (
        Relation::new(RelId(0), "link", weight_type, Mode::Incidence),
        MemoryRegistry::new(),
    )
}

fn edge_ids(records: impl Iterator<Item = Record>) -> Vec<EdgeId> {
    records.filter_map(|r| r.edge_id()).collect()
}

#[test]
fn test_adjacency_basic() {
    let mut rel = Relation::new(RelId(0), "friend", WeightType::Bool, Mode::Adjacency);
    let mut registry = MemoryRegistry::new();

    assert_eq!(rel.add(&mut registry, node(0).into(), node(1).into(), None, None).unwrap(), None);
    rel.add(&mut registry, node(0).into(), node(2).into(), None, None).unwrap();
    rel.add(&mut registry, node(3).into(), node(2).into(), None, None).unwrap();
    assert_eq!(rel.len(), 3);
    assert!(matches!(rel.storage(), RelationStorage::Adjacency(_)));

    // Repeating an insertion is idempotent
    rel.add(&mut registry, node(0).into(), node(1).into(), None, None).unwrap();
    assert_eq!(rel.len(), 3);

    assert_eq!(rel.query(Some(node(0)), None).count(), 2);
    assert_eq!(rel.query(None, Some(node(2))).count(), 2);
    assert_eq!(rel.query(Some(node(3)), Some(node(2))).count(), 1);
    assert_eq!(rel.query(Some(node(3)), Some(node(1))).count(), 0);
    assert_eq!(rel.iter().count(), 3);

    // Adjacency never touches the edge counter
    assert_eq!(registry.peek_edge_id().unwrap(), EdgeId(0));
}

#[test]
fn test_adjacency_rejects_edge_ids_and_multi_endpoints() {
    let mut rel = Relation::new(RelId(0), "friend", WeightType::Bool, Mode::Adjacency);
    let mut registry = MemoryRegistry::new();

    let multi = Endpoint::Multiple(vec![node(0), node(1)]);
    assert!(rel.add(&mut registry, multi, node(2).into(), None, None).is_err());
    assert!(rel
        .add(&mut registry, node(0).into(), node(2).into(), None, Some(EdgeId(4)))
        .is_err());
    assert!(rel.is_empty());
}

#[test]
fn test_incidence_four_cases() {
    let (mut rel, mut registry) = incidence(WeightType::Int64);

    // e0: {0, 1} -> {5, 6}; e1: {1} -> {5}; e2: {2} -> {7}
    let e0 = rel
        .add(
            &mut registry,
            vec![node(0), node(1)].into(),
            vec![node(5), node(6)].into(),
            Some(Weight::Int64(3)),
            None,
        )
        .unwrap()
        .unwrap();
    let e1 = rel
        .add(&mut registry, node(1).into(), node(5).into(), Some(Weight::Int64(4)), None)
        .unwrap()
        .unwrap();
    let e2 = rel
        .add(&mut registry, node(2).into(), node(7).into(), None, None)
        .unwrap()
        .unwrap();
    assert_eq!((e0, e1, e2), (EdgeId(0), EdgeId(1), EdgeId(2)));

    // bound, bound: edge ids leaving 1 that reach 5
    assert_eq!(edge_ids(rel.query(Some(node(1)), Some(node(5)))), vec![e0, e1]);
    // bound, wildcard
    assert_eq!(edge_ids(rel.query(Some(node(1)), None)), vec![e0, e1]);
    assert_eq!(edge_ids(rel.query(Some(node(0)), None)), vec![e0]);
    // wildcard, bound
    assert_eq!(edge_ids(rel.query(None, Some(node(6)))), vec![e0]);
    // wildcard, wildcard
    assert_eq!(edge_ids(rel.iter()), vec![e0, e1, e2]);

    // Unknown endpoints contribute nothing
    assert_eq!(rel.query(Some(node(42)), None).count(), 0);
    assert_eq!(rel.query(Some(node(2)), Some(node(5))).count(), 0);

    // Length counts (edge, destination) pairs
    assert_eq!(rel.len(), 4);
    assert_eq!(rel.edge_count(), 3);
}

#[test]
fn test_incidence_hyperedge_record() {
    let (mut rel, mut registry) = incidence(WeightType::Bool);
    let e = rel
        .add(
            &mut registry,
            vec![node(4), node(2)].into(),
            vec![node(9)].into(),
            None,
            None,
        )
        .unwrap()
        .unwrap();

    let h = rel.hyperedge(e).unwrap();
    // Endpoints come back in ascending id order
    assert_eq!(h.sources, vec![node(2), node(4)]);
    assert_eq!(h.destinations, vec![node(9)]);
    assert_eq!(rel.hyperedge_weights(e), vec![Weight::Bool(true)]);
    assert!(rel.hyperedge(EdgeId(77)).is_none());
}

#[test]
fn test_incidence_weights_and_triples() {
    let (mut rel, mut registry) = incidence(WeightType::Float64);
    let e = rel
        .add(
            &mut registry,
            vec![node(0), node(1)].into(),
            node(2).into(),
            Some(Weight::Float64(0.5)),
            None,
        )
        .unwrap();

    assert_eq!(rel.weight(node(1), node(2), e), Some(Weight::Float64(0.5)));
    // Source not attached to the edge
    assert_eq!(rel.weight(node(3), node(2), e), None);
    // Incidence weights need the edge id
    assert_eq!(rel.weight(node(1), node(2), None), None);

    let triples: Vec<_> = rel.triples().collect();
    assert_eq!(
        triples,
        vec![
            (node(0), node(2), e, Weight::Float64(0.5)),
            (node(1), node(2), e, Weight::Float64(0.5)),
        ]
    );
}

#[test]
fn test_incidence_successors_join_through_edges() {
    let (mut rel, mut registry) = incidence(WeightType::Int64);
    // e0: {0, 1} -> {5, 6}; e1: {0} -> {5}
    let e0 = rel
        .add(
            &mut registry,
            vec![node(0), node(1)].into(),
            vec![node(6), node(5)].into(),
            Some(Weight::Int64(2)),
            None,
        )
        .unwrap();
    let e1 = rel
        .add(&mut registry, node(0).into(), node(5).into(), Some(Weight::Int64(9)), None)
        .unwrap();

    let reached: Vec<_> = rel.successors(node(0)).collect();
    assert_eq!(
        reached,
        vec![
            (node(5), e0, Weight::Int64(2)),
            (node(6), e0, Weight::Int64(2)),
            (node(5), e1, Weight::Int64(9)),
        ]
    );
    assert_eq!(rel.successors(node(1)).count(), 2);
    assert_eq!(rel.successors(node(5)).count(), 0);
}

#[test]
fn test_adjacency_successors_are_the_row() {
    let mut rel = Relation::new(RelId(0), "distance", WeightType::Int64, Mode::Adjacency);
    let mut registry = MemoryRegistry::new();
    rel.add(&mut registry, node(0).into(), node(3).into(), Some(Weight::Int64(7)), None).unwrap();
    rel.add(&mut registry, node(0).into(), node(1).into(), Some(Weight::Int64(4)), None).unwrap();

    let reached: Vec<_> = rel.successors(node(0)).collect();
    assert_eq!(reached, vec![(node(1), None, Weight::Int64(4)), (node(3), None, Weight::Int64(7))]);
}

#[test]
fn test_attach_only_to_stored_hyperedges() {
    let (mut rel, mut registry) = incidence(WeightType::Bool);
    let e0 = rel.add(&mut registry, node(0).into(), node(1).into(), None, None).unwrap().unwrap();

    rel.add(&mut registry, node(2).into(), node(3).into(), None, Some(e0)).unwrap();
    assert_eq!(rel.hyperedge(e0).unwrap().sources, vec![node(0), node(2)]);

    // Allocated elsewhere, never allocated, and out of range
    let elsewhere = registry.new_edge_id().unwrap();
    for edge in [elsewhere, EdgeId(50), EdgeId(u64::MAX)] {
        let err = rel.add(&mut registry, node(4).into(), node(5).into(), None, Some(edge)).unwrap_err();
        assert!(matches!(err, graphony::GraphError::MissingEdge { .. }));
    }
    assert_eq!(rel.len(), 2);
    assert_eq!(rel.edge_count(), 1);
}

#[test]
fn test_weights_are_stored_in_the_relation_type() {
    let mut rel = Relation::new(RelId(0), "hops", WeightType::UInt64, Mode::Adjacency);
    let mut registry = MemoryRegistry::new();
    rel.add(&mut registry, node(0).into(), node(1).into(), Some(Weight::Int64(3)), None).unwrap();
    assert_eq!(rel.weight(node(0), node(1), None), Some(Weight::UInt64(3)));
}

#[test]
fn test_incidence_type_error_writes_nothing() {
    let (mut rel, mut registry) = incidence(WeightType::Int64);
    let err = rel
        .add(
            &mut registry,
            node(0).into(),
            node(1).into(),
            Some(Weight::Bool(true)),
            None,
        )
        .unwrap_err();
    assert!(matches!(err, graphony::GraphError::WeightType { .. }));
    assert!(rel.is_empty());
    // No edge id was burnt either
    assert_eq!(registry.new_edge_id().unwrap(), EdgeId(0));
}

#[test]
fn test_incidence_remove_and_clear() {
    let (mut rel, mut registry) = incidence(WeightType::Bool);
    let e0 = rel
        .add(&mut registry, vec![node(0), node(1)].into(), node(2).into(), None, None)
        .unwrap()
        .unwrap();
    let e1 = rel
        .add(&mut registry, node(1).into(), node(3).into(), None, None)
        .unwrap()
        .unwrap();

    assert_eq!(rel.remove(Some(node(0)), None), 1);
    assert!(rel.hyperedge(e0).is_none());
    // Node 1 lost its membership of e0 along with the rest of it
    assert_eq!(edge_ids(rel.query(Some(node(1)), None)), vec![e1]);

    assert!(rel.remove_edge(e1));
    assert!(!rel.remove_edge(e1));
    assert!(rel.is_empty());

    rel.add(&mut registry, node(5).into(), node(6).into(), None, None).unwrap();
    rel.clear();
    assert!(rel.is_empty());
}

#[test]
fn test_projection_with_custom_composition() {
    use graphony::matrix::Composition;

    /// Counts the edge ids joining each pair
    struct CountPaths;

    impl Composition<bool, Weight> for CountPaths {
        type Output = u64;

        fn multiply(&self, _: &bool, _: &Weight, _: u64) -> u64 {
            1
        }

        fn accumulate(&self, acc: &mut u64, next: u64) {
            *acc += next;
        }
    }

    let (mut rel, mut registry) = incidence(WeightType::Bool);
    for _ in 0..3 {
        rel.add(&mut registry, node(0).into(), node(1).into(), None, None).unwrap();
    }
    let counts = rel.project_with(&CountPaths).unwrap();
    assert_eq!(counts.get(0, 1), Some(&3));
}

#[test]
fn test_registry_node_ids_are_dense() {
    let mut registry = MemoryRegistry::new();
    assert_eq!(registry.upsert_node("a").unwrap(), node(0));
    assert_eq!(registry.upsert_node("b").unwrap(), node(1));
    assert_eq!(registry.upsert_node("a").unwrap(), node(0));
    assert_eq!(registry.get_node_name(node(1)).unwrap().as_deref(), Some("b"));
    assert_eq!(registry.get_node_name(node(7)).unwrap(), None);
}
