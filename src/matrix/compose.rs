//! Composition of two matrices over their shared dimension.
//!
//! For `A : I × K` and `B : K × J`, composition enumerates every
//! `(i, j, k)` with `A[i,k]` and `B[k,j]` both stored. It walks `A`'s rows,
//! and for each stored `k` walks `B`'s row `k`; nothing dense is ever built,
//! so the cost is proportional to the entries actually touched.
//!
//! [`mxm`] reduces those triples into a new matrix with a [`Composition`]
//! operator, which is how a relation's incidence pair is projected down
//! to a plain source × destination matrix.

use std::collections::btree_map::{self, BTreeMap};

use super::semiring::Composition;
use super::sparse::SparseMatrix;
use crate::id::Index;

/// One composed entry: `A[row, shared]` joined with `B[shared, col]`.
#[derive(Debug, PartialEq)]
pub struct Composed<'a, L, R> {
    pub row: Index,
    pub col: Index,
    pub shared: Index,
    pub left: &'a L,
    pub right: &'a R,
}

// Manual impls: the derive would demand `L: Clone`, `R: Clone`.
impl<L, R> Clone for Composed<'_, L, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<L, R> Copy for Composed<'_, L, R> {}

/// Lazy composition iterator, in `(row, shared, col)` order.
pub struct Compose<'a, L, R, I> {
    b: &'a SparseMatrix<R>,
    rows: I,
    current: Option<(Index, btree_map::Iter<'a, Index, L>)>,
    inner: Option<(Index, &'a L, btree_map::Iter<'a, Index, R>)>,
}

impl<'a, L, R, I> Iterator for Compose<'a, L, R, I>
where
    I: Iterator<Item = (&'a Index, &'a BTreeMap<Index, L>)>,
{
    type Item = Composed<'a, L, R>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // Drain B[k, :] for the current (i, k)
            if let Some((shared, left, b_row)) = &mut self.inner {
                if let Some((col, right)) = b_row.next() {
                    let (row, _) = self.current.as_ref()?;
                    return Some(Composed {
                        row: *row,
                        col: *col,
                        shared: *shared,
                        left: *left,
                        right,
                    });
                }
                self.inner = None;
            }

            // Next stored k in A[i, :]
            if let Some((_, a_row)) = &mut self.current {
                if let Some((shared, left)) = a_row.next() {
                    if let Some(b_row) = self.b.rows.get(shared) {
                        self.inner = Some((*shared, left, b_row.iter()));
                    }
                    continue;
                }
            }

            // Next stored row i of A
            let (row, a_row) = self.rows.next()?;
            self.current = Some((*row, a_row.iter()));
        }
    }
}

/// Compose every row of `a` with `b`.
pub fn compose<'a, L, R>(
    a: &'a SparseMatrix<L>,
    b: &'a SparseMatrix<R>,
) -> impl Iterator<Item = Composed<'a, L, R>> + 'a {
    Compose {
        b,
        rows: a.rows.iter(),
        current: None,
        inner: None,
    }
}

/// Compose a single row `a[row, :]` with `b`.
pub fn compose_row<'a, L, R>(
    a: &'a SparseMatrix<L>,
    b: &'a SparseMatrix<R>,
    row: Index,
) -> impl Iterator<Item = Composed<'a, L, R>> + 'a {
    Compose {
        b,
        rows: a.rows.get_key_value(&row).into_iter(),
        current: None,
        inner: None,
    }
}

/// Sparse matrix product of `a` and `b` under `op`.
pub fn mxm<L, R, C>(a: &SparseMatrix<L>, b: &SparseMatrix<R>, op: &C) -> SparseMatrix<C::Output>
where
    C: Composition<L, R>,
{
    let mut out = SparseMatrix::new(a.nrows(), b.ncols());
    for entry in compose(a, b) {
        let value = op.multiply(entry.left, entry.right, entry.shared);
        match out.get_mut(entry.row, entry.col) {
            Some(acc) => op.accumulate(acc, value),
            None => {
                out.set(entry.row, entry.col, value);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::semiring::{AnySecond, AnySecondI, PlusTimes};

    /// sources 0,1 -> edge 10 -> destinations 5,6; source 1 -> edge 11 -> destination 5
    fn incidence_pair() -> (SparseMatrix<bool>, SparseMatrix<i64>) {
        let a: SparseMatrix<bool> = [(0, 10, true), (1, 10, true), (1, 11, true)]
            .into_iter()
            .collect();
        let b: SparseMatrix<i64> = [(10, 5, 7), (10, 6, 8), (11, 5, 9)].into_iter().collect();
        (a, b)
    }

    #[test]
    fn test_compose_enumerates_all_triples() {
        let (a, b) = incidence_pair();
        let triples: Vec<_> = compose(&a, &b)
            .map(|c| (c.row, c.col, c.shared, *c.right))
            .collect();
        assert_eq!(
            triples,
            vec![
                (0, 5, 10, 7),
                (0, 6, 10, 8),
                (1, 5, 10, 7),
                (1, 6, 10, 8),
                (1, 5, 11, 9),
            ]
        );
    }

    #[test]
    fn test_compose_row() {
        let (a, b) = incidence_pair();
        let triples: Vec<_> = compose_row(&a, &b, 0).map(|c| (c.col, c.shared)).collect();
        assert_eq!(triples, vec![(5, 10), (6, 10)]);
        assert_eq!(compose_row(&a, &b, 3).count(), 0);
    }

    #[test]
    fn test_compose_skips_dangling_shared_index() {
        let a: SparseMatrix<bool> = [(0, 1, true), (0, 2, true)].into_iter().collect();
        let b: SparseMatrix<i64> = [(2, 3, 4)].into_iter().collect();
        let triples: Vec<_> = compose(&a, &b).map(|c| (c.row, c.col, c.shared)).collect();
        assert_eq!(triples, vec![(0, 3, 2)]);
    }

    #[test]
    fn test_mxm_variants() {
        let (a, b) = incidence_pair();

        let weights = mxm(&a, &b, &AnySecond);
        assert_eq!(weights.nvals(), 4);
        // any: first contribution in shared-index order wins
        assert_eq!(weights.get(1, 5), Some(&7));

        let edges = mxm(&a, &b, &AnySecondI);
        assert_eq!(edges.get(0, 6), Some(&10));
        assert_eq!(edges.get(1, 5), Some(&10));

        let counts_a = a.map(|_| 1i64);
        let ones_b = b.map(|_| 1i64);
        let paths = mxm(&counts_a, &ones_b, &PlusTimes);
        assert_eq!(paths.get(1, 5), Some(&2));
        assert_eq!(paths.get(0, 5), Some(&1));
    }
}
