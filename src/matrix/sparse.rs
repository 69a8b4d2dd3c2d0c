//! Hypersparse matrix storage.

use std::collections::btree_map::{self, BTreeMap};

use roaring::RoaringTreemap;

use crate::id::Index;

/// Largest addressable dimension. Matrices are hypersparse: only stored
/// rows cost memory, so the default shape is effectively unbounded.
pub const INDEX_MAX: Index = 1 << 60;

/// A sparse matrix over values of type `T`.
///
/// Rows are kept in a `BTreeMap` of `BTreeMap`s (row-major, sorted), and a
/// per-column `RoaringTreemap` of row indices makes column slices direct
/// instead of a full scan. Iteration order is always ascending by index,
/// so it is deterministic for a given state.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseMatrix<T> {
    nrows: Index,
    ncols: Index,
    pub(crate) rows: BTreeMap<Index, BTreeMap<Index, T>>,
    cols: BTreeMap<Index, RoaringTreemap>,
    nvals: usize,
}

impl<T> Default for SparseMatrix<T> {
    fn default() -> Self {
        Self::hypersparse()
    }
}

impl<T> SparseMatrix<T> {
    /// Create an empty matrix with the given shape
    pub fn new(nrows: Index, ncols: Index) -> Self {
        Self {
            nrows,
            ncols,
            rows: BTreeMap::new(),
            cols: BTreeMap::new(),
            nvals: 0,
        }
    }

    /// Create an empty `INDEX_MAX` × `INDEX_MAX` matrix
    pub fn hypersparse() -> Self {
        Self::new(INDEX_MAX, INDEX_MAX)
    }

    pub fn nrows(&self) -> Index {
        self.nrows
    }

    pub fn ncols(&self) -> Index {
        self.ncols
    }

    /// Number of stored entries
    pub fn nvals(&self) -> usize {
        self.nvals
    }

    pub fn is_empty(&self) -> bool {
        self.nvals == 0
    }

    pub fn get(&self, row: Index, col: Index) -> Option<&T> {
        self.rows.get(&row).and_then(|r| r.get(&col))
    }

    pub fn get_mut(&mut self, row: Index, col: Index) -> Option<&mut T> {
        self.rows.get_mut(&row).and_then(|r| r.get_mut(&col))
    }

    pub fn contains(&self, row: Index, col: Index) -> bool {
        self.get(row, col).is_some()
    }

    /// Store a value, returning the one it replaced
    pub fn set(&mut self, row: Index, col: Index, value: T) -> Option<T> {
        debug_assert!(row < self.nrows, "row {} out of bounds", row);
        debug_assert!(col < self.ncols, "col {} out of bounds", col);

        let previous = self.rows.entry(row).or_default().insert(col, value);
        if previous.is_none() {
            self.cols.entry(col).or_default().insert(row);
            self.nvals += 1;
        }
        previous
    }

    /// Remove a value, returning it if it was present
    pub fn remove(&mut self, row: Index, col: Index) -> Option<T> {
        let entries = self.rows.get_mut(&row)?;
        let removed = entries.remove(&col)?;
        if entries.is_empty() {
            self.rows.remove(&row);
        }
        if let Some(rows) = self.cols.get_mut(&col) {
            rows.remove(row);
            if rows.is_empty() {
                self.cols.remove(&col);
            }
        }
        self.nvals -= 1;
        Some(removed)
    }

    /// Remove a whole row, returning its `(col, value)` entries
    pub fn remove_row(&mut self, row: Index) -> Vec<(Index, T)> {
        let Some(entries) = self.rows.remove(&row) else {
            return Vec::new();
        };
        for col in entries.keys() {
            if let Some(rows) = self.cols.get_mut(col) {
                rows.remove(row);
                if rows.is_empty() {
                    self.cols.remove(col);
                }
            }
        }
        self.nvals -= entries.len();
        entries.into_iter().collect()
    }

    /// Remove a whole column, returning its `(row, value)` entries
    pub fn remove_col(&mut self, col: Index) -> Vec<(Index, T)> {
        let Some(rows) = self.cols.remove(&col) else {
            return Vec::new();
        };
        let mut removed = Vec::with_capacity(rows.len() as usize);
        for row in rows.iter() {
            if let Some(entries) = self.rows.get_mut(&row) {
                if let Some(value) = entries.remove(&col) {
                    removed.push((row, value));
                }
                if entries.is_empty() {
                    self.rows.remove(&row);
                }
            }
        }
        self.nvals -= removed.len();
        removed
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.cols.clear();
        self.nvals = 0;
    }

    /// Row slice `[row, :]` as `(col, value)` pairs
    pub fn row(&self, row: Index) -> impl Iterator<Item = (Index, &T)> + '_ {
        self.rows
            .get(&row)
            .into_iter()
            .flat_map(|entries| entries.iter().map(|(c, v)| (*c, v)))
    }

    /// Column slice `[:, col]` as `(row, value)` pairs
    pub fn col(&self, col: Index) -> impl Iterator<Item = (Index, &T)> + '_ {
        self.cols.get(&col).into_iter().flat_map(move |rows| {
            rows.iter()
                .filter_map(move |r| self.get(r, col).map(|v| (r, v)))
        })
    }

    /// Column indices present in `row`, as a bitmap
    pub fn row_pattern(&self, row: Index) -> RoaringTreemap {
        self.rows
            .get(&row)
            .map(|entries| entries.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Row indices present in `col`, as a bitmap
    pub fn col_pattern(&self, col: Index) -> RoaringTreemap {
        self.cols.get(&col).cloned().unwrap_or_default()
    }

    /// Number of entries in `row`
    pub fn row_len(&self, row: Index) -> usize {
        self.rows.get(&row).map_or(0, BTreeMap::len)
    }

    /// Indices of non-empty rows
    pub fn row_indices(&self) -> impl Iterator<Item = Index> + '_ {
        self.rows.keys().copied()
    }

    /// Indices of non-empty columns
    pub fn col_indices(&self) -> impl Iterator<Item = Index> + '_ {
        self.cols.keys().copied()
    }

    /// Iterate all `(row, col, value)` triples in row-major order
    pub fn iter(&self) -> Triples<'_, T> {
        Triples {
            rows: self.rows.iter(),
            current: None,
        }
    }

    /// Apply `f` to every stored value
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> SparseMatrix<U> {
        let mut out = SparseMatrix::new(self.nrows, self.ncols);
        for (row, col, value) in self.iter() {
            out.set(row, col, f(value));
        }
        out
    }
}

impl<T: Clone> SparseMatrix<T> {
    pub fn transpose(&self) -> SparseMatrix<T> {
        let mut out = SparseMatrix::new(self.ncols, self.nrows);
        for (row, col, value) in self.iter() {
            out.set(col, row, value.clone());
        }
        out
    }
}

/// Row-major iterator over stored triples
pub struct Triples<'a, T> {
    rows: btree_map::Iter<'a, Index, BTreeMap<Index, T>>,
    current: Option<(Index, btree_map::Iter<'a, Index, T>)>,
}

impl<'a, T> Iterator for Triples<'a, T> {
    type Item = (Index, Index, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((row, entries)) = &mut self.current {
                if let Some((col, value)) = entries.next() {
                    return Some((*row, *col, value));
                }
            }
            let (row, entries) = self.rows.next()?;
            self.current = Some((*row, entries.iter()));
        }
    }
}

impl<T> FromIterator<(Index, Index, T)> for SparseMatrix<T> {
    fn from_iter<I: IntoIterator<Item = (Index, Index, T)>>(iter: I) -> Self {
        let mut m = SparseMatrix::hypersparse();
        for (row, col, value) in iter {
            m.set(row, col, value);
        }
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_matrix_basic() {
        let mut m = SparseMatrix::new(3, 4);
        assert!(m.is_empty());

        assert_eq!(m.set(0, 1, 10), None);
        assert_eq!(m.set(2, 1, 20), None);
        assert_eq!(m.set(2, 3, 30), None);
        assert_eq!(m.nvals(), 3);
        assert_eq!(m.get(2, 1), Some(&20));
        assert!(!m.contains(1, 1));

        // Overwrite keeps the count
        assert_eq!(m.set(0, 1, 11), Some(10));
        assert_eq!(m.nvals(), 3);
    }

    #[test]
    fn test_row_and_column_slices() {
        let mut m = SparseMatrix::hypersparse();
        m.set(5, 7, 'a');
        m.set(5, 2, 'b');
        m.set(9, 7, 'c');

        let row: Vec<_> = m.row(5).collect();
        assert_eq!(row, vec![(2, &'b'), (7, &'a')]);

        let col: Vec<_> = m.col(7).collect();
        assert_eq!(col, vec![(5, &'a'), (9, &'c')]);

        assert!(m.row(6).next().is_none());
        assert!(m.col(3).next().is_none());
    }

    #[test]
    fn test_remove_keeps_column_index_consistent() {
        let mut m = SparseMatrix::hypersparse();
        m.set(1, 1, ());
        m.set(2, 1, ());

        assert_eq!(m.remove(1, 1), Some(()));
        assert_eq!(m.remove(1, 1), None);
        assert_eq!(m.col(1).count(), 1);
        assert_eq!(m.row_indices().collect::<Vec<_>>(), vec![2]);

        assert_eq!(m.remove_col(1).len(), 1);
        assert!(m.is_empty());
        assert_eq!(m.col_indices().count(), 0);
    }

    #[test]
    fn test_remove_row() {
        let mut m = SparseMatrix::hypersparse();
        m.set(4, 0, 1);
        m.set(4, 8, 2);
        m.set(3, 8, 3);

        assert_eq!(m.remove_row(4), vec![(0, 1), (8, 2)]);
        assert_eq!(m.nvals(), 1);
        assert_eq!(m.col_pattern(8).iter().collect::<Vec<_>>(), vec![3]);
        assert!(m.remove_row(4).is_empty());
    }

    #[test]
    fn test_iter_and_transpose() {
        let m: SparseMatrix<i64> = [(1, 0, 5), (0, 2, 6)].into_iter().collect();
        let triples: Vec<_> = m.iter().map(|(r, c, v)| (r, c, *v)).collect();
        assert_eq!(triples, vec![(0, 2, 6), (1, 0, 5)]);

        let t = m.transpose();
        assert_eq!(t.get(2, 0), Some(&6));
        assert_eq!(t.get(0, 1), Some(&5));
        assert_eq!(t.nvals(), 2);
    }
}
