//! Sparse linear-algebra substrate for relations
//!
//! A relation is stored as one or two sparse matrices over the node and edge
//! id spaces. Queries are answered by slicing rows and columns and by
//! composing the two incidence matrices over their shared (edge) dimension,
//! never by materializing a dense product.
//!
//! # Architecture
//!
//! - **sparse**: Hypersparse row-major storage with a Roaring column index
//! - **semiring**: Numeric semirings and the composition operators (`any.second`, ...)
//! - **compose**: Lazy composition iterator and `mxm`

mod compose;
pub mod semiring;
mod sparse;

pub use compose::{compose, compose_row, mxm, Composed};
pub use semiring::{AnySecond, AnySecondI, Composition, PlusTimes, Semiring};
pub use sparse::{SparseMatrix, Triples, INDEX_MAX};
