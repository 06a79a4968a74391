//! Arrow-diagram transformer: activities on arcs, events on nodes.
//!
//! The compiled activity-on-node graph is turned inside out. Every activity
//! becomes an edge between a tail and a head event, and precedence links
//! become dummy edges. Redundant dummies are dropped and dummies that carry
//! no information are collapsed by merging their end events, as long as that
//! never leaves two edges between the same pair of events.

use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

use crate::config::CompilerConfig;
use crate::error::CompilerError;
use crate::graph::{reduce_in_place, DependencyGraphBuilder, Digraph};
use crate::ids::{Id, IdGenerator};
use crate::models::{
    Activity, ArrowEdge, ArrowGraph, ArrowNode, CompilationResult, DashStyle, EdgeKind,
};
use crate::{log_debug, log_decision, log_phase};

/// Layout weight of critical edges; everything else weighs 1.
pub const CRITICAL_EDGE_WEIGHT: f64 = 2.0;
pub const DEFAULT_EDGE_WEIGHT: f64 = 1.0;

#[derive(Clone, Debug)]
struct ArrowActivity {
    activity_id: Option<Id>,
    name: String,
    duration: i32,
    is_dummy: bool,
}

impl ArrowActivity {
    fn dummy() -> Self {
        Self {
            activity_id: None,
            name: String::new(),
            duration: 0,
            is_dummy: true,
        }
    }
}

type EventGraph = Digraph<(), ArrowActivity>;

/// Build the arrow diagram for a compiled plan.
///
/// Precedence comes from declared and resource dependencies. When
/// `config.reduce_transitive_edges` is set and the plan is acyclic, implied
/// dependencies are removed first.
pub fn arrow_graph(
    result: &CompilationResult,
    config: &CompilerConfig,
) -> Result<ArrowGraph, CompilerError> {
    let verbosity = config.verbosity;
    log_phase!(verbosity, "building arrow diagram");

    let built = DependencyGraphBuilder::new(IdGenerator::default(), IdGenerator::default())
        .with_resource_dependencies(true)
        .build(&result.dependent_activities)?;
    let mut vertex = built.graph;
    if config.reduce_transitive_edges && built.cycles.is_empty() {
        let removed = reduce_in_place(&mut vertex)?;
        log_decision!(verbosity, "dropped {} implied dependencies", removed.len());
    }

    let lookup: FxHashMap<Id, &Activity> = result
        .dependent_activities
        .iter()
        .map(|da| (da.id(), &da.activity))
        .collect();

    let mut events = EventGraph::new(IdGenerator::default(), IdGenerator::default());
    let start = events.add_new_node(());
    let end = events.add_new_node(());
    let mut tails: FxHashMap<Id, Id> = FxHashMap::default();
    let mut heads: FxHashMap<Id, Id> = FxHashMap::default();

    for id in vertex.node_ids() {
        let Some(activity) = lookup.get(&id) else {
            continue;
        };
        let tail = events.add_new_node(());
        let head = events.add_new_node(());
        events.add_edge(
            tail,
            head,
            ArrowActivity {
                activity_id: Some(id),
                name: activity.name.clone(),
                duration: activity.duration,
                is_dummy: activity.is_dummy() && activity.can_be_removed,
            },
        )?;
        tails.insert(id, tail);
        heads.insert(id, head);
    }

    for id in vertex.node_ids() {
        let (Some(&tail), Some(&head)) = (tails.get(&id), heads.get(&id)) else {
            continue;
        };
        let predecessors = vertex.predecessors(id);
        if predecessors.is_empty() {
            events.add_edge(start, tail, ArrowActivity::dummy())?;
        }
        for predecessor in predecessors {
            if let Some(&predecessor_head) = heads.get(&predecessor) {
                events.add_edge(predecessor_head, tail, ArrowActivity::dummy())?;
            }
        }
        if vertex.successors(id).is_empty() {
            events.add_edge(head, end, ArrowActivity::dummy())?;
        }
    }

    remove_redundant_dummies(&mut events, verbosity)?;
    let (start, end) = merge_dummies(&mut events, start, end, verbosity)?;
    log_debug!(verbosity, "start event {}, end event {}", start, end);

    let (earliest, latest) = event_times(&events, &lookup, result.duration);
    Ok(export(&events, &lookup, &earliest, &latest))
}

/// Drop dummies whose ordering is already implied by another path.
fn remove_redundant_dummies(events: &mut EventGraph, verbosity: u8) -> Result<(), CompilerError> {
    for edge_id in events.edge_ids() {
        let Some(edge) = events.edge(edge_id) else {
            continue;
        };
        if !edge.content.is_dummy {
            continue;
        }
        let (source, target) = (edge.source, edge.target);
        if events.reachable_without(source, target, edge_id) {
            events.remove_edge(edge_id)?;
            log_decision!(verbosity, "removed redundant dummy {} -> {}", source, target);
        }
    }
    Ok(())
}

/// Collapse dummies that are the only way out of their source or the only
/// way into their target. Returns the possibly renamed start and end events.
fn merge_dummies(
    events: &mut EventGraph,
    mut start: Id,
    mut end: Id,
    verbosity: u8,
) -> Result<(Id, Id), CompilerError> {
    loop {
        let mut merged = false;
        for edge_id in events.edge_ids() {
            let Some(edge) = events.edge(edge_id) else {
                continue;
            };
            if !edge.content.is_dummy || edge.source == edge.target {
                continue;
            }
            let (source, target) = (edge.source, edge.target);
            let out_degree = events.outgoing_edges(source).len();
            let in_degree = events.incoming_edges(target).len();

            // keep the event on the side that still has other edges
            let (keep, absorb) = if out_degree == 1
                && can_merge(events, target, source, edge_id)
            {
                (target, source)
            } else if in_degree == 1 && can_merge(events, source, target, edge_id) {
                (source, target)
            } else {
                continue;
            };

            events.remove_edge(edge_id)?;
            events.merge_nodes(keep, absorb)?;
            if start == absorb {
                start = keep;
            }
            if end == absorb {
                end = keep;
            }
            log_decision!(verbosity, "merged event {} into {}", absorb, keep);
            merged = true;
        }
        if !merged {
            return Ok((start, end));
        }
    }
}

/// Whether folding `absorb` into `keep` (dropping `via`) leaves no parallel
/// edges and no self-loops.
fn can_merge(events: &EventGraph, keep: Id, absorb: Id, via: Id) -> bool {
    let (keep_sources, keep_targets) = neighbours(events, keep, via);
    let (absorb_sources, absorb_targets) = neighbours(events, absorb, via);
    if keep_sources.contains(&absorb)
        || keep_targets.contains(&absorb)
        || absorb_sources.contains(&keep)
        || absorb_targets.contains(&keep)
    {
        return false;
    }
    keep_sources.is_disjoint(&absorb_sources) && keep_targets.is_disjoint(&absorb_targets)
}

fn neighbours(events: &EventGraph, id: Id, skip: Id) -> (BTreeSet<Id>, BTreeSet<Id>) {
    let sources = events
        .incoming_edges(id)
        .into_iter()
        .filter(|e| *e != skip)
        .filter_map(|e| events.edge(e))
        .map(|e| e.source)
        .collect();
    let targets = events
        .outgoing_edges(id)
        .into_iter()
        .filter(|e| *e != skip)
        .filter_map(|e| events.edge(e))
        .map(|e| e.target)
        .collect();
    (sources, targets)
}

/// Earliest and latest finish per event.
///
/// Activity edges take the compiled activity times when known; dummies
/// propagate their source event. Events on or after a cycle stay unknown,
/// and latest times are only computed for acyclic diagrams.
fn event_times(
    events: &EventGraph,
    lookup: &FxHashMap<Id, &Activity>,
    duration: i32,
) -> (FxHashMap<Id, i32>, FxHashMap<Id, i32>) {
    let topo = events.topological_order();
    let mut earliest: FxHashMap<Id, i32> = FxHashMap::default();
    let mut latest: FxHashMap<Id, i32> = FxHashMap::default();

    for &id in &topo.order {
        let value = events
            .incoming_edges(id)
            .into_iter()
            .filter_map(|e| events.edge(e))
            .filter_map(|edge| {
                let known = edge
                    .content
                    .activity_id
                    .and_then(|a| lookup.get(&a))
                    .and_then(|a| a.earliest_finish_time);
                known.or_else(|| earliest.get(&edge.source).map(|t| t + edge.content.duration))
            })
            .max()
            .unwrap_or(0);
        earliest.insert(id, value);
    }

    if !topo.is_complete() {
        return (earliest, latest);
    }

    for &id in topo.order.iter().rev() {
        let value = events
            .outgoing_edges(id)
            .into_iter()
            .filter_map(|e| events.edge(e))
            .filter_map(|edge| {
                let known = edge
                    .content
                    .activity_id
                    .and_then(|a| lookup.get(&a))
                    .and_then(|a| a.latest_start_time);
                known.or_else(|| latest.get(&edge.target).map(|t| t - edge.content.duration))
            })
            .min()
            .unwrap_or(duration);
        latest.insert(id, value);
    }
    (earliest, latest)
}

fn label(value: Option<i32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "?".to_string())
}

fn export(
    events: &EventGraph,
    lookup: &FxHashMap<Id, &Activity>,
    earliest: &FxHashMap<Id, i32>,
    latest: &FxHashMap<Id, i32>,
) -> ArrowGraph {
    let nodes = events
        .nodes()
        .map(|node| {
            let earliest_finish_time = earliest.get(&node.id).copied();
            let latest_finish_time = latest.get(&node.id).copied();
            ArrowNode {
                id: node.id,
                earliest_finish_time,
                latest_finish_time,
                label: format!("{}|{}", label(earliest_finish_time), label(latest_finish_time)),
            }
        })
        .collect();

    let edges = events
        .edges()
        .map(|edge| {
            let activity = edge.content.activity_id.and_then(|a| lookup.get(&a));
            let total_slack = match activity {
                Some(a) => a.total_slack,
                None => match (latest.get(&edge.target), earliest.get(&edge.source)) {
                    (Some(lf), Some(ef)) => Some(lf - ef - edge.content.duration),
                    _ => None,
                },
            };
            let critical = total_slack == Some(0);
            let kind = match (edge.content.is_dummy, critical) {
                (false, false) => EdgeKind::Normal,
                (false, true) => EdgeKind::Critical,
                (true, false) => EdgeKind::Dummy,
                (true, true) => EdgeKind::CriticalDummy,
            };
            ArrowEdge {
                id: edge.id,
                activity_id: edge.content.activity_id,
                name: edge.content.name.clone(),
                source_node_id: edge.source,
                target_node_id: edge.target,
                duration: edge.content.duration,
                total_slack,
                kind,
                dash_style: dash_style(kind),
                weight: edge_weight(kind),
            }
        })
        .collect();

    ArrowGraph { nodes, edges }
}

pub fn dash_style(kind: EdgeKind) -> DashStyle {
    match kind {
        EdgeKind::Normal | EdgeKind::Critical => DashStyle::Solid,
        EdgeKind::Dummy | EdgeKind::CriticalDummy => DashStyle::Dashed,
    }
}

pub fn edge_weight(kind: EdgeKind) -> f64 {
    match kind {
        EdgeKind::Critical | EdgeKind::CriticalDummy => CRITICAL_EDGE_WEIGHT,
        EdgeKind::Normal | EdgeKind::Dummy => DEFAULT_EDGE_WEIGHT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DependentActivity;

    /// Activity with hand-set times, as a compile would leave it.
    fn make_activity(id: Id, duration: i32, deps: &[Id], es: i32, ls: i32) -> DependentActivity {
        let mut activity = Activity::new(id, format!("a{}", id), duration);
        activity.earliest_start_time = Some(es);
        activity.earliest_finish_time = Some(es + duration);
        activity.latest_start_time = Some(ls);
        activity.latest_finish_time = Some(ls + duration);
        activity.total_slack = Some(ls - es);
        DependentActivity::new(activity, deps.iter().copied())
    }

    fn result(activities: Vec<DependentActivity>, duration: i32) -> CompilationResult {
        CompilationResult {
            dependent_activities: activities,
            duration,
            ..Default::default()
        }
    }

    fn edge_for(graph: &ArrowGraph, activity_id: Id) -> &ArrowEdge {
        graph
            .edges
            .iter()
            .find(|e| e.activity_id == Some(activity_id))
            .unwrap()
    }

    #[test]
    fn test_chain_collapses_to_path() {
        let plan = result(
            vec![make_activity(1, 5, &[], 0, 0), make_activity(2, 3, &[1], 5, 5)],
            8,
        );
        let graph = arrow_graph(&plan, &CompilerConfig::default()).unwrap();
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 2);
        assert!(graph.edges.iter().all(|e| e.kind == EdgeKind::Critical));
        assert_eq!(edge_for(&graph, 1).target_node_id, edge_for(&graph, 2).source_node_id);

        let mut labels: Vec<&str> = graph.nodes.iter().map(|n| n.label.as_str()).collect();
        labels.sort_unstable();
        assert_eq!(labels, vec!["0|0", "5|5", "8|8"]);
    }

    #[test]
    fn test_parallel_activities_need_one_dummy() {
        let plan = result(
            vec![make_activity(1, 2, &[], 0, 1), make_activity(2, 3, &[], 0, 0)],
            3,
        );
        let graph = arrow_graph(&plan, &CompilerConfig::default()).unwrap();
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 3);

        let short = edge_for(&graph, 1);
        let long = edge_for(&graph, 2);
        assert_eq!(short.kind, EdgeKind::Normal);
        assert_eq!(short.dash_style, DashStyle::Solid);
        assert_eq!(long.kind, EdgeKind::Critical);
        assert_eq!(long.weight, CRITICAL_EDGE_WEIGHT);
        assert_eq!(short.source_node_id, long.source_node_id);
        assert_ne!(short.target_node_id, long.target_node_id);

        let dummy = graph.edges.iter().find(|e| e.activity_id.is_none()).unwrap();
        assert_eq!(dummy.kind, EdgeKind::CriticalDummy);
        assert_eq!(dummy.dash_style, DashStyle::Dashed);
        // no two edges share both endpoints
        let pairs: BTreeSet<(Id, Id)> = graph
            .edges
            .iter()
            .map(|e| (e.source_node_id, e.target_node_id))
            .collect();
        assert_eq!(pairs.len(), graph.edges.len());
    }

    #[test]
    fn test_removable_zero_duration_is_dashed() {
        let mut milestone = make_activity(3, 0, &[1, 2], 3, 3);
        milestone.activity.can_be_removed = true;
        let plan = result(
            vec![
                make_activity(1, 2, &[], 0, 1),
                make_activity(2, 3, &[], 0, 0),
                milestone,
                make_activity(4, 1, &[3], 3, 3),
            ],
            4,
        );
        let graph = arrow_graph(&plan, &CompilerConfig::default()).unwrap();
        for edge in graph.edges.iter().filter(|e| e.duration == 0) {
            assert_eq!(edge.dash_style, DashStyle::Dashed);
        }
        assert_eq!(edge_for(&graph, 4).kind, EdgeKind::Critical);
    }

    #[test]
    fn test_unknown_times_label_question_mark() {
        let first = DependentActivity::new(Activity::new(1, "a1", 2), [2]);
        let second = DependentActivity::new(Activity::new(2, "a2", 2), [1]);
        let graph = arrow_graph(&result(vec![first, second], 0), &CompilerConfig::default()).unwrap();
        assert!(graph.nodes.iter().any(|n| n.label == "?|?"));
        assert!(graph.edges.iter().all(|e| e.kind != EdgeKind::Critical));
    }

    #[test]
    fn test_style_mapping_is_exhaustive() {
        assert_eq!(dash_style(EdgeKind::Normal), DashStyle::Solid);
        assert_eq!(dash_style(EdgeKind::CriticalDummy), DashStyle::Dashed);
        assert_eq!(edge_weight(EdgeKind::Dummy), DEFAULT_EDGE_WEIGHT);
        assert_eq!(edge_weight(EdgeKind::Critical), CRITICAL_EDGE_WEIGHT);
    }
}
