//! Graphony: typed relations and hyperedges over a shared node space
//!
//! A [`Graph`] holds named [`Relation`]s. Each relation stores its edges as
//! hypersparse matrices over dense node ids:
//!
//! - an **adjacency** relation keeps one matrix `A[source, destination]`;
//! - an **incidence** relation keeps `A[source, edge]` and `B[edge, destination]`,
//!   giving every edge its own id so that one edge can join several sources to
//!   several destinations.
//!
//! Names resolve to ids through an [`IdentityRegistry`]. Queries are
//! `(relation?, source?, destination?)` [`Pattern`]s and yield lazy
//! [`Edge`] / [`Hyperedge`] views.
//!
//! ```
//! use graphony::{Graph, Pattern};
//!
//! let mut g = Graph::new();
//! g.add("friend", "bob", "alice").unwrap();
//! g.add("coworker", "bob", "jane").unwrap();
//!
//! let from_bob: Vec<String> = g
//!     .query(&Pattern::any().source("bob"))
//!     .unwrap()
//!     .map(|edge| edge.to_string())
//!     .collect();
//! assert_eq!(from_bob, ["friend(bob, alice)", "coworker(bob, jane)"]);
//! ```

pub mod cache;
pub mod config;
pub mod edge;
pub mod error;
pub mod graph;
pub mod id;
pub mod matrix;
pub mod node;
pub mod registry;
pub mod relation;
pub mod weight;

pub use config::GraphConfig;
pub use edge::{Edge, EdgeRecord, Hyperedge, HyperedgeRecord, Record, View};
pub use error::{GraphError, Result};
pub use graph::{Graph, IngestRow, Pattern, Query};
pub use id::{EdgeId, NodeId, NumericId, RelId};
pub use node::{Node, NodeRef};
pub use registry::{Attrs, IdentityRegistry, MemoryRegistry};
pub use relation::{Endpoint, Mode, Relation, RelationDescriptor, RelationStorage};
pub use weight::{Weight, WeightType};
