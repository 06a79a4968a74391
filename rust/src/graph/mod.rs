//! Activity dependency graph: arena storage, construction, validation and
//! transitive reduction.
//!
//! The scheduling graph is activity-on-node: each node id is an activity id
//! and each edge is a precedence link. The arrow diagram (see
//! [`crate::arrow`]) is its activity-on-arc dual.

mod arena;
mod builder;
mod reduction;
pub mod validation;

pub use arena::{Digraph, Edge, Node, NodeKind, TopologicalOrder};
pub use builder::{DependencyGraph, DependencyGraphBuilder, VertexGraph};
pub use reduction::{reduce_in_place, transitive_reduction};
