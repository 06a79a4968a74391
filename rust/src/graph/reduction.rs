//! Transitive reduction: drop direct edges already implied by longer paths.

use crate::error::CompilerError;
use crate::ids::Id;

use super::arena::Digraph;

/// Remove every edge `a -> b` for which another path from `a` to `b` exists.
///
/// Edges are examined in ascending id order. Each removal keeps reachability
/// intact, so an edge that is the only route between its endpoints is never
/// removed and a second run removes nothing. Returns the removed edge ids.
pub fn reduce_in_place<N, E>(graph: &mut Digraph<N, E>) -> Result<Vec<Id>, CompilerError> {
    let mut removed = Vec::new();
    for edge_id in graph.edge_ids() {
        let Some(edge) = graph.edge(edge_id) else {
            continue;
        };
        let (source, target) = (edge.source, edge.target);
        if graph.reachable_without(source, target, edge_id) {
            graph.remove_edge(edge_id)?;
            removed.push(edge_id);
        }
    }
    Ok(removed)
}

/// Reduced copy of `graph`; the input is left untouched.
pub fn transitive_reduction<N: Clone, E: Clone>(
    graph: &Digraph<N, E>,
) -> Result<Digraph<N, E>, CompilerError> {
    let mut reduced = graph.clone_object()?;
    reduce_in_place(&mut reduced)?;
    Ok(reduced)
}
