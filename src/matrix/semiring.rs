//! Weight algebra for sparse matrix products.
//!
//! [`Semiring`] is implemented by the four weight scalars. Its `one` is the
//! weight an unweighted edge gets, and [`PlusTimes`] uses `add`/`mul` to sum
//! path products.
//!
//! Incidence relations are composed with operators that do not sum at all:
//! the "any" family keeps one contribution per output cell (the first, in
//! index order), and the "i" variant yields the shared index instead of a
//! value. [`Composition`] covers both kinds.

use std::fmt::Debug;

use crate::id::Index;

/// Scalar weights with a sum and a product.
pub trait Semiring: Clone + Debug + PartialEq + Default + 'static {
    /// Neutral for `add`
    fn zero() -> Self;

    /// Neutral for `mul`; also the default edge weight
    fn one() -> Self;

    fn add(&self, other: &Self) -> Self;

    fn mul(&self, other: &Self) -> Self;

    fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    fn is_one(&self) -> bool {
        *self == Self::one()
    }
}

// bool: OR / AND
impl Semiring for bool {
    #[inline]
    fn zero() -> Self { false }
    #[inline]
    fn one() -> Self { true }
    #[inline]
    fn add(&self, other: &Self) -> Self { *self || *other }
    #[inline]
    fn mul(&self, other: &Self) -> Self { *self && *other }
}

// Integers wrap (signed) or saturate (unsigned) instead of panicking

impl Semiring for i64 {
    #[inline]
    fn zero() -> Self { 0 }
    #[inline]
    fn one() -> Self { 1 }
    #[inline]
    fn add(&self, other: &Self) -> Self { self.wrapping_add(*other) }
    #[inline]
    fn mul(&self, other: &Self) -> Self { self.wrapping_mul(*other) }
}

impl Semiring for u64 {
    #[inline]
    fn zero() -> Self { 0 }
    #[inline]
    fn one() -> Self { 1 }
    #[inline]
    fn add(&self, other: &Self) -> Self { self.saturating_add(*other) }
    #[inline]
    fn mul(&self, other: &Self) -> Self { self.saturating_mul(*other) }
}

impl Semiring for f64 {
    #[inline]
    fn zero() -> Self { 0.0 }
    #[inline]
    fn one() -> Self { 1.0 }
    #[inline]
    fn add(&self, other: &Self) -> Self { self + other }
    #[inline]
    fn mul(&self, other: &Self) -> Self { self * other }
}

// ============================================================================
// Composition operators
// ============================================================================

/// Multiply/accumulate pair applied to composed `(A[i,k], B[k,j])` pairs.
///
/// `shared` is `k`, the index the two matrices are joined over. For an
/// incidence relation that is the edge id.
pub trait Composition<L, R> {
    type Output: Clone;

    fn multiply(&self, left: &L, right: &R, shared: Index) -> Self::Output;

    /// Fold another product into an existing output cell.
    fn accumulate(&self, acc: &mut Self::Output, next: Self::Output);
}

/// `any.second`: the output is the right-hand value; the left-hand value
/// (a source membership flag, for incidence relations) is ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnySecond;

impl<L, R: Clone> Composition<L, R> for AnySecond {
    type Output = R;

    #[inline]
    fn multiply(&self, _left: &L, right: &R, _shared: Index) -> R {
        right.clone()
    }

    #[inline]
    fn accumulate(&self, _acc: &mut R, _next: R) {}
}

/// `any.secondi`: the output is the shared index itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnySecondI;

impl<L, R> Composition<L, R> for AnySecondI {
    type Output = Index;

    #[inline]
    fn multiply(&self, _left: &L, _right: &R, shared: Index) -> Index {
        shared
    }

    #[inline]
    fn accumulate(&self, _acc: &mut Index, _next: Index) {}
}

/// Conventional `plus.times` over a [`Semiring`].
#[derive(Clone, Copy, Debug, Default)]
pub struct PlusTimes;

impl<S: Semiring> Composition<S, S> for PlusTimes {
    type Output = S;

    #[inline]
    fn multiply(&self, left: &S, right: &S, _shared: Index) -> S {
        left.mul(right)
    }

    #[inline]
    fn accumulate(&self, acc: &mut S, next: S) {
        *acc = acc.add(&next);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_is_or_and() {
        let cases = [(false, false), (false, true), (true, false), (true, true)];
        for (x, y) in cases {
            assert_eq!(x.add(&y), x || y);
            assert_eq!(x.mul(&y), x && y);
        }
        assert!(bool::one().is_one() && !bool::one().is_zero());
    }

    #[test]
    fn test_numeric_semirings() {
        assert_eq!(3i64.add(&5), 8);
        assert_eq!(3i64.mul(&5), 15);
        assert_eq!(u64::MAX.add(&1), u64::MAX);
        assert_eq!(2.5f64.mul(&2.0), 5.0);
        assert!(0.0f64.is_zero());
    }

    #[test]
    fn test_any_second_ignores_left() {
        let op = AnySecond;
        assert_eq!(Composition::<bool, i64>::multiply(&op, &false, &7, 3), 7);

        let mut acc = 1i64;
        Composition::<bool, i64>::accumulate(&op, &mut acc, 9);
        assert_eq!(acc, 1, "any keeps the first contribution");
    }

    #[test]
    fn test_any_secondi_yields_shared_index() {
        let op = AnySecondI;
        assert_eq!(Composition::<bool, i64>::multiply(&op, &true, &7, 42), 42);
    }

    #[test]
    fn test_plus_times_sums_paths() {
        let op = PlusTimes;
        let mut acc = op.multiply(&2i64, &3i64, 0);
        op.accumulate(&mut acc, op.multiply(&4i64, &5i64, 1));
        assert_eq!(acc, 26);
    }
}
