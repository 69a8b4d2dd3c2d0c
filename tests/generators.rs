//! Proptest generators for graphony data
//!
//! Provides `Strategy` implementations for node names, relation names,
//! edge lists, and sparse matrices used across the property tests.

#![allow(dead_code)]

use graphony::matrix::SparseMatrix;
use graphony::id::Index;
use proptest::collection::{btree_set, vec};
use proptest::prelude::*;

// ============================================================================
// Name Generation
// ============================================================================

/// Generate a valid identifier (alphanumeric, starting with a letter)
pub fn arb_identifier() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9_]{0,15}".prop_map(String::from)
}

/// Node names are free-form; keep them short and printable
pub fn arb_node_name() -> impl Strategy<Value = String> {
    "[a-z]{1,6}".prop_map(String::from)
}

/// A few distinct relation names
pub fn arb_relation_names(max: usize) -> impl Strategy<Value = Vec<String>> {
    btree_set(arb_identifier(), 1..=max).prop_map(|names| names.into_iter().collect())
}

// ============================================================================
// Edge Generation
// ============================================================================

/// `(source, destination)` name pairs over a small node pool, so that
/// repeated endpoints (and overwrites) actually happen
pub fn arb_edge_list(max_edges: usize) -> impl Strategy<Value = Vec<(String, String)>> {
    vec(("[a-e]", "[a-e]"), 0..=max_edges)
}

/// `(relation index, source, destination, weight)` rows
pub fn arb_weighted_rows(
    relations: usize,
    max_rows: usize,
) -> impl Strategy<Value = Vec<(usize, String, String, i64)>> {
    vec((0..relations, "[a-f]", "[a-f]", -100i64..100), 0..=max_rows)
}

/// A hyperedge: a non-empty source set and a non-empty destination set
pub fn arb_hyperedge() -> impl Strategy<Value = (Vec<String>, Vec<String>)> {
    (
        btree_set("[a-h]", 1..=3).prop_map(|s| s.into_iter().collect()),
        btree_set("[a-h]", 1..=3).prop_map(|s| s.into_iter().collect()),
    )
}

// ============================================================================
// Matrix Generation
// ============================================================================

/// Sparse integer matrix with indices drawn from `0..dim`
pub fn arb_matrix(dim: Index, max_entries: usize) -> impl Strategy<Value = SparseMatrix<i64>> {
    vec((0..dim, 0..dim, -10i64..10), 0..=max_entries)
        .prop_map(|entries| entries.into_iter().collect())
}

/// Boolean pattern matrix with indices drawn from `0..dim`
pub fn arb_pattern(dim: Index, max_entries: usize) -> impl Strategy<Value = SparseMatrix<bool>> {
    vec((0..dim, 0..dim), 0..=max_entries)
        .prop_map(|entries| entries.into_iter().map(|(r, c)| (r, c, true)).collect())
}
