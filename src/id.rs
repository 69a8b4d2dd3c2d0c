//! ID types for graphony
//!
//! Every id is a dense integer handed out by the identity registry:
//! - `NodeId` indexes the node namespace shared by all relations of a graph
//! - `RelId` indexes the relation namespace
//! - `EdgeId` is drawn from a single graph-wide counter and is never reused
//!
//! Ids double as sparse matrix indices, so they are `u64` underneath
//! (the index type of [`crate::matrix::SparseMatrix`]).

use std::fmt;

/// Matrix index type
pub type Index = u64;

/// Common interface for the numeric id newtypes.
pub trait NumericId: Copy + Eq + Ord + std::hash::Hash + fmt::Debug {
    fn from_u64(raw: u64) -> Self;
    fn index(self) -> u64;

    #[inline]
    fn from_usize(raw: usize) -> Self {
        Self::from_u64(raw as u64)
    }
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u64);

        impl NumericId for $name {
            #[inline]
            fn from_u64(raw: u64) -> Self {
                $name(raw)
            }

            #[inline]
            fn index(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "#{}", self.0)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }
    };
}

define_id!(
    /// Node id: row index of `A`, column index of `B` (or of an adjacency `A`)
    NodeId
);

define_id!(
    /// Relation id
    RelId
);

define_id!(
    /// Edge id: the shared dimension between the two incidence matrices
    EdgeId
);
