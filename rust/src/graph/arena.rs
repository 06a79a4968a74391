//! Arena-backed directed graph addressed by stable integer ids.
//!
//! Topology lives in a `petgraph` [`StableDiGraph`] whose weights are the
//! caller-facing ids; node and edge payloads live in id-keyed maps. Indices
//! stay valid across removals, so ids never need remapping and a clone is a
//! plain structural copy.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use petgraph::algo::{has_path_connecting, tarjan_scc, DfsSpace};
use petgraph::stable_graph::{EdgeIndex, EdgeReference, NodeIndex, StableDiGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::{EdgeFiltered, EdgeRef, NodeIndexable};
use petgraph::Direction;

use crate::error::CompilerError;
use crate::ids::{Id, IdGenerator};

/// Position of a node in the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// No incoming edges, at least one outgoing.
    Start,
    /// No outgoing edges, at least one incoming.
    End,
    /// No edges at all.
    Isolated,
    Normal,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node<N> {
    pub id: Id,
    pub content: N,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Edge<E> {
    pub id: Id,
    pub source: Id,
    pub target: Id,
    pub content: E,
}

/// Result of Kahn's algorithm.
///
/// `order` holds every node whose ancestors are all acyclic; `blocked` holds
/// the nodes on a cycle or downstream of one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TopologicalOrder {
    pub order: Vec<Id>,
    pub blocked: Vec<Id>,
}

impl TopologicalOrder {
    pub fn is_complete(&self) -> bool {
        self.blocked.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct Digraph<N, E> {
    topology: StableDiGraph<Id, Id>,
    node_index: BTreeMap<Id, NodeIndex>,
    edge_index: BTreeMap<Id, EdgeIndex>,
    nodes: BTreeMap<Id, Node<N>>,
    edges: BTreeMap<Id, Edge<E>>,
    node_ids: IdGenerator,
    edge_ids: IdGenerator,
}

impl<N, E> Digraph<N, E> {
    pub fn new(node_ids: IdGenerator, edge_ids: IdGenerator) -> Self {
        Self {
            topology: StableDiGraph::new(),
            node_index: BTreeMap::new(),
            edge_index: BTreeMap::new(),
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            node_ids,
            edge_ids,
        }
    }

    fn index_of(&self, id: Id) -> Result<NodeIndex, CompilerError> {
        self.node_index
            .get(&id)
            .copied()
            .ok_or(CompilerError::UnknownNode(id))
    }

    fn insert_node(&mut self, id: Id, content: N) {
        let index = self.topology.add_node(id);
        self.node_index.insert(id, index);
        self.nodes.insert(id, Node { id, content });
    }

    /// Insert a node under a caller-chosen id.
    pub fn add_node(&mut self, id: Id, content: N) -> Result<(), CompilerError> {
        if self.nodes.contains_key(&id) {
            return Err(CompilerError::InvalidGraph(format!("duplicate node {}", id)));
        }
        self.insert_node(id, content);
        Ok(())
    }

    /// Insert a node with a freshly generated id.
    pub fn add_new_node(&mut self, content: N) -> Id {
        let mut id = self.node_ids.next_id();
        while self.nodes.contains_key(&id) {
            id = self.node_ids.next_id();
        }
        self.insert_node(id, content);
        id
    }

    /// Connect two existing nodes, returning the new edge id.
    pub fn add_edge(&mut self, source: Id, target: Id, content: E) -> Result<Id, CompilerError> {
        let source_index = self.index_of(source)?;
        let target_index = self.index_of(target)?;
        let mut id = self.edge_ids.next_id();
        while self.edges.contains_key(&id) {
            id = self.edge_ids.next_id();
        }
        let index = self.topology.add_edge(source_index, target_index, id);
        self.edge_index.insert(id, index);
        self.edges.insert(
            id,
            Edge {
                id,
                source,
                target,
                content,
            },
        );
        Ok(id)
    }

    pub fn remove_edge(&mut self, id: Id) -> Result<Edge<E>, CompilerError> {
        let index = self
            .edge_index
            .remove(&id)
            .ok_or(CompilerError::UnknownEdge(id))?;
        self.topology.remove_edge(index);
        self.edges.remove(&id).ok_or(CompilerError::UnknownEdge(id))
    }

    /// Fold `absorb` into `keep`: every edge touching `absorb` is re-pointed
    /// at `keep` and `absorb` is removed.
    pub fn merge_nodes(&mut self, keep: Id, absorb: Id) -> Result<N, CompilerError> {
        if keep == absorb {
            return Err(CompilerError::InvalidGraph(format!(
                "cannot merge node {} into itself",
                keep
            )));
        }
        let keep_index = self.index_of(keep)?;
        let absorb_index = self.index_of(absorb)?;

        let touching: BTreeSet<Id> = self
            .incoming_edges(absorb)
            .into_iter()
            .chain(self.outgoing_edges(absorb))
            .collect();
        for edge_id in touching {
            let Some(index) = self.edge_index.get(&edge_id).copied() else {
                continue;
            };
            let Some((source, target)) = self.topology.edge_endpoints(index) else {
                continue;
            };
            let source = if source == absorb_index { keep_index } else { source };
            let target = if target == absorb_index { keep_index } else { target };
            self.topology.remove_edge(index);
            let index = self.topology.add_edge(source, target, edge_id);
            self.edge_index.insert(edge_id, index);
            if let Some(edge) = self.edges.get_mut(&edge_id) {
                if edge.source == absorb {
                    edge.source = keep;
                }
                if edge.target == absorb {
                    edge.target = keep;
                }
            }
        }

        self.topology.remove_node(absorb_index);
        self.node_index.remove(&absorb);
        let absorbed = self
            .nodes
            .remove(&absorb)
            .ok_or(CompilerError::UnknownNode(absorb))?;
        Ok(absorbed.content)
    }

    pub fn node(&self, id: Id) -> Option<&Node<N>> {
        self.nodes.get(&id)
    }

    pub fn edge(&self, id: Id) -> Option<&Edge<E>> {
        self.edges.get(&id)
    }

    pub fn contains_node(&self, id: Id) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node<N>> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge<E>> {
        self.edges.values()
    }

    pub fn node_ids(&self) -> Vec<Id> {
        self.nodes.keys().copied().collect()
    }

    pub fn edge_ids(&self) -> Vec<Id> {
        self.edges.keys().copied().collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn edges_directed(&self, id: Id, direction: Direction) -> Vec<Id> {
        let Some(&index) = self.node_index.get(&id) else {
            return Vec::new();
        };
        let mut ids: Vec<Id> = self
            .topology
            .edges_directed(index, direction)
            .map(|e| *e.weight())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Ids of the edges ending at `id`, ascending.
    pub fn incoming_edges(&self, id: Id) -> Vec<Id> {
        self.edges_directed(id, Direction::Incoming)
    }

    /// Ids of the edges leaving `id`, ascending.
    pub fn outgoing_edges(&self, id: Id) -> Vec<Id> {
        self.edges_directed(id, Direction::Outgoing)
    }

    pub fn node_kind(&self, id: Id) -> Option<NodeKind> {
        let index = *self.node_index.get(&id)?;
        let has_incoming = self
            .topology
            .edges_directed(index, Direction::Incoming)
            .next()
            .is_some();
        let has_outgoing = self
            .topology
            .edges_directed(index, Direction::Outgoing)
            .next()
            .is_some();
        Some(match (has_incoming, has_outgoing) {
            (false, false) => NodeKind::Isolated,
            (false, true) => NodeKind::Start,
            (true, false) => NodeKind::End,
            (true, true) => NodeKind::Normal,
        })
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> Vec<Id> {
        self.nodes
            .keys()
            .copied()
            .filter(|&id| self.node_kind(id) == Some(kind))
            .collect()
    }

    fn neighbours(&self, id: Id, direction: Direction) -> Vec<Id> {
        let Some(&index) = self.node_index.get(&id) else {
            return Vec::new();
        };
        let set: BTreeSet<Id> = self
            .topology
            .neighbors_directed(index, direction)
            .map(|n| self.topology[n])
            .collect();
        set.into_iter().collect()
    }

    /// Direct successor node ids (deduplicated, ascending).
    pub fn successors(&self, id: Id) -> Vec<Id> {
        self.neighbours(id, Direction::Outgoing)
    }

    /// Direct predecessor node ids (deduplicated, ascending).
    pub fn predecessors(&self, id: Id) -> Vec<Id> {
        self.neighbours(id, Direction::Incoming)
    }

    /// Id of the lowest-numbered edge from `source` to `target`, if any.
    pub fn find_edge(&self, source: Id, target: Id) -> Option<Id> {
        let source_index = *self.node_index.get(&source)?;
        let target_index = *self.node_index.get(&target)?;
        self.topology
            .edges_directed(source_index, Direction::Outgoing)
            .filter(|e| e.target() == target_index)
            .map(|e| *e.weight())
            .min()
    }

    /// Check structural integrity.
    ///
    /// Every edge must be indexed between the nodes it names. A graph holding
    /// Normal nodes must also hold at least one Start and one End node; only
    /// meaningful for acyclic graphs.
    pub fn validate(&self) -> Result<(), CompilerError> {
        for edge in self.edges.values() {
            let source = self.index_of(edge.source)?;
            let target = self.index_of(edge.target)?;
            let index = self
                .edge_index
                .get(&edge.id)
                .copied()
                .ok_or(CompilerError::UnknownEdge(edge.id))?;
            if self.topology.edge_endpoints(index) != Some((source, target)) {
                return Err(CompilerError::InvalidGraph(format!(
                    "edge {} is not indexed between {} and {}",
                    edge.id, edge.source, edge.target
                )));
            }
        }
        if self.topology.edge_count() != self.edges.len()
            || self.topology.node_count() != self.nodes.len()
        {
            return Err(CompilerError::InvalidGraph(
                "topology and payload tables disagree".to_string(),
            ));
        }

        let mut has_normal = false;
        let mut has_start = false;
        let mut has_end = false;
        for &id in self.nodes.keys() {
            match self.node_kind(id) {
                Some(NodeKind::Normal) => has_normal = true,
                Some(NodeKind::Start) => has_start = true,
                Some(NodeKind::End) => has_end = true,
                Some(NodeKind::Isolated) | None => {}
            }
        }
        if has_normal && !(has_start && has_end) {
            return Err(CompilerError::InvalidGraph(
                "graph has normal nodes but no start or end node".to_string(),
            ));
        }
        Ok(())
    }

    /// Kahn's algorithm; ties resolve by ascending node id.
    pub fn topological_order(&self) -> TopologicalOrder {
        let mut in_degree: BTreeMap<Id, usize> = self
            .nodes
            .keys()
            .map(|&id| (id, self.predecessors(id).len()))
            .collect();

        let mut queue: VecDeque<Id> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(&id, _)| id)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(id) = queue.pop_front() {
            order.push(id);
            for successor in self.successors(id) {
                if let Some(degree) = in_degree.get_mut(&successor) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(successor);
                    }
                }
            }
        }

        let placed: BTreeSet<Id> = order.iter().copied().collect();
        let blocked = self
            .nodes
            .keys()
            .copied()
            .filter(|id| !placed.contains(id))
            .collect();
        TopologicalOrder { order, blocked }
    }

    /// Every elementary cycle, each in precedence order starting from its
    /// lowest node id. Cycles are sorted.
    ///
    /// Strongly connected components come from Tarjan's algorithm; cycles
    /// are then enumerated inside each cyclic component, once per cycle, from
    /// the cycle's lowest member.
    pub fn cycles(&self) -> Vec<Vec<Id>> {
        let mut cycles = Vec::new();
        for component in tarjan_scc(&self.topology) {
            let members: BTreeSet<Id> = component.iter().map(|&n| self.topology[n]).collect();
            let is_cycle = members.len() > 1
                || component
                    .first()
                    .is_some_and(|&n| self.topology.find_edge(n, n).is_some());
            if !is_cycle {
                continue;
            }
            for &start in &members {
                self.cycles_from(start, &members, &mut cycles);
            }
        }
        cycles.sort();
        cycles
    }

    /// Simple cycles through `start` whose other members are in `members`
    /// and above `start`. Iterative so long cycles cannot overflow the stack.
    fn cycles_from(&self, start: Id, members: &BTreeSet<Id>, cycles: &mut Vec<Vec<Id>>) {
        let mut path = vec![start];
        let mut on_path: BTreeSet<Id> = BTreeSet::from([start]);
        // (successors of the node at the same depth in `path`, next position)
        let mut work: Vec<(Vec<Id>, usize)> = vec![(self.successors(start), 0)];

        while let Some((successors, pos)) = work.last_mut() {
            let Some(&next) = successors.get(*pos) else {
                work.pop();
                if let Some(id) = path.pop() {
                    on_path.remove(&id);
                }
                continue;
            };
            *pos += 1;
            if next == start {
                cycles.push(path.clone());
            } else if next > start && members.contains(&next) && on_path.insert(next) {
                path.push(next);
                work.push((self.successors(next), 0));
            }
        }
    }

    /// Number of weakly connected components.
    pub fn connected_components(&self) -> usize {
        let mut sets = UnionFind::<usize>::new(NodeIndexable::node_bound(&self.topology));
        for &index in self.edge_index.values() {
            if let Some((source, target)) = self.topology.edge_endpoints(index) {
                sets.union(source.index(), target.index());
            }
        }
        let roots: BTreeSet<usize> = self
            .node_index
            .values()
            .map(|n| sets.find(n.index()))
            .collect();
        roots.len()
    }

    /// Whether `to` is reachable from `from` over at least one edge, without
    /// using edge `skip_edge`.
    pub fn reachable_without(&self, from: Id, to: Id, skip_edge: Id) -> bool {
        let (Some(&from_index), Some(&to_index)) =
            (self.node_index.get(&from), self.node_index.get(&to))
        else {
            return false;
        };
        let skip = self.edge_index.get(&skip_edge).copied();
        let filtered =
            EdgeFiltered::from_fn(&self.topology, |edge: EdgeReference<'_, Id>| {
                Some(edge.id()) != skip
            });
        let mut space = DfsSpace::new(&filtered);
        self.topology
            .edges_directed(from_index, Direction::Outgoing)
            .filter(|edge| Some(edge.id()) != skip)
            .any(|edge| {
                edge.target() == to_index
                    || has_path_connecting(&filtered, edge.target(), to_index, Some(&mut space))
            })
    }
}

impl<N: Clone, E: Clone> Digraph<N, E> {
    /// Structurally independent copy.
    ///
    /// The copy's generators continue from one below the lowest id in use,
    /// so ids it synthesizes never collide with the source graph's.
    pub fn clone_object(&self) -> Result<Self, CompilerError> {
        Ok(Self {
            topology: self.topology.clone(),
            node_index: self.node_index.clone(),
            edge_index: self.edge_index.clone(),
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            node_ids: IdGenerator::below(self.nodes.keys().copied())?,
            edge_ids: IdGenerator::below(self.edges.keys().copied())?,
        })
    }
}
