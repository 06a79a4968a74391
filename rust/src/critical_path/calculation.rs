//! Critical path calculation using forward and backward passes.

use rustc_hash::FxHashMap;

use crate::error::CompilerError;
use crate::graph::VertexGraph;
use crate::ids::Id;
use crate::models::{Activity, DependentActivity};
use crate::{log_debug, log_phase};

use super::types::{ActivityTiming, CriticalPathResult};

/// Calculate earliest/latest times and slack for every activity in `graph`.
///
/// Nodes are visited in topological order. When the graph has cycles, only
/// activities upstream of every cycle get earliest times and the backward
/// pass is skipped entirely.
///
/// # Arguments
/// * `graph` - Dependency graph whose node ids are activity ids
/// * `activities` - The activities the graph was built from
/// * `verbosity` - Logging level
pub fn calculate_critical_path(
    graph: &VertexGraph,
    activities: &[DependentActivity],
    verbosity: u8,
) -> Result<CriticalPathResult, CompilerError> {
    let lookup: FxHashMap<Id, &Activity> = activities
        .iter()
        .map(|da| (da.id(), &da.activity))
        .collect();
    let activity = |id: Id| lookup.get(&id).copied().ok_or(CompilerError::UnknownNode(id));

    let topo = graph.topological_order();
    let mut timings: FxHashMap<Id, ActivityTiming> =
        FxHashMap::with_capacity_and_hasher(topo.order.len(), Default::default());

    // Forward pass: earliest start = max of predecessor earliest finishes
    for &id in &topo.order {
        let current = activity(id)?;
        let mut earliest_start = graph
            .predecessors(id)
            .iter()
            .filter_map(|p| timings.get(p))
            .map(|t| t.earliest_finish)
            .max()
            .unwrap_or(0);
        if let Some(minimum) = current.minimum_earliest_start_time {
            earliest_start = earliest_start.max(minimum);
        }
        let earliest_finish = earliest_start + current.duration;
        log_debug!(
            verbosity,
            "forward {}: es={} ef={}",
            id,
            earliest_start,
            earliest_finish
        );
        timings.insert(
            id,
            ActivityTiming {
                earliest_start,
                earliest_finish,
                ..Default::default()
            },
        );
    }

    let duration = timings
        .values()
        .map(|t| t.earliest_finish)
        .max()
        .unwrap_or(0);

    if !topo.is_complete() {
        log_phase!(
            verbosity,
            "skipping backward pass: {} activities on or after a cycle",
            topo.blocked.len()
        );
        return Ok(CriticalPathResult {
            timings,
            topological_order: topo.order,
            blocked: topo.blocked,
            duration,
        });
    }

    // Backward pass: latest finish = min of successor latest starts
    for &id in topo.order.iter().rev() {
        let current = activity(id)?;
        let successors: Vec<&ActivityTiming> = graph
            .successors(id)
            .iter()
            .filter_map(|s| timings.get(s))
            .collect();

        let mut latest_finish = successors
            .iter()
            .filter_map(|t| t.latest_start)
            .min()
            .unwrap_or(duration);
        if let Some(maximum) = current.maximum_latest_finish_time {
            latest_finish = latest_finish.min(maximum);
        }
        let next_earliest_start = successors.iter().map(|t| t.earliest_start).min();

        let Some(timing) = timings.get_mut(&id) else {
            continue;
        };
        let total_slack = latest_finish - timing.earliest_finish;
        let gap = match next_earliest_start {
            Some(start) => start - timing.earliest_finish,
            None => 0,
        };
        timing.latest_finish = Some(latest_finish);
        timing.latest_start = Some(latest_finish - current.duration);
        timing.total_slack = Some(total_slack);
        // a clipped latest finish caps free slack too; never negative
        timing.free_slack = Some(gap.min(total_slack).max(0));
        log_debug!(
            verbosity,
            "backward {}: lf={} total_slack={:?} free_slack={:?}",
            id,
            latest_finish,
            timing.total_slack,
            timing.free_slack
        );
    }

    Ok(CriticalPathResult {
        timings,
        topological_order: topo.order,
        blocked: Vec::new(),
        duration,
    })
}

/// Write computed timings into the activities, clearing stale values first.
pub fn apply_timings(activities: &mut [DependentActivity], result: &CriticalPathResult) {
    for da in activities.iter_mut() {
        let allocated = std::mem::take(&mut da.activity.allocated_to_resources);
        da.activity.clear_computed();
        da.activity.allocated_to_resources = allocated;
        let Some(timing) = result.timings.get(&da.activity.id) else {
            continue;
        };
        da.activity.earliest_start_time = Some(timing.earliest_start);
        da.activity.earliest_finish_time = Some(timing.earliest_finish);
        da.activity.latest_start_time = timing.latest_start;
        da.activity.latest_finish_time = timing.latest_finish;
        da.activity.total_slack = timing.total_slack;
        da.activity.free_slack = timing.free_slack;
    }
}
