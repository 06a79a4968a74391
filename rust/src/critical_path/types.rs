//! Types for critical path calculation.

use rustc_hash::FxHashMap;

use crate::ids::Id;

/// Per-activity timing information.
///
/// Latest times and slack stay `None` when the backward pass could not run
/// (the graph has cycles).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActivityTiming {
    /// Earliest possible start time (from forward pass).
    pub earliest_start: i32,
    /// Earliest possible finish time (from forward pass).
    pub earliest_finish: i32,
    /// Latest allowable start time (from backward pass).
    pub latest_start: Option<i32>,
    /// Latest allowable finish time (from backward pass).
    pub latest_finish: Option<i32>,
    /// latest_finish - earliest_finish.
    pub total_slack: Option<i32>,
    /// Room before the earliest successor would be delayed.
    pub free_slack: Option<i32>,
}

impl ActivityTiming {
    pub fn is_critical(&self) -> bool {
        self.total_slack == Some(0)
    }
}

/// Result of a critical path calculation.
#[derive(Clone, Debug, Default)]
pub struct CriticalPathResult {
    /// Timing for every activity the passes could reach.
    pub timings: FxHashMap<Id, ActivityTiming>,
    /// Activity ids in the order the forward pass visited them.
    pub topological_order: Vec<Id>,
    /// Activities on or downstream of a cycle; no times were computed for them.
    pub blocked: Vec<Id>,
    /// Project duration: the largest earliest finish.
    pub duration: i32,
}

impl CriticalPathResult {
    /// Ids of zero-slack activities, ascending.
    pub fn critical_activity_ids(&self) -> Vec<Id> {
        let mut ids: Vec<Id> = self
            .timings
            .iter()
            .filter(|(_, timing)| timing.is_critical())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_critical() {
        let timing = ActivityTiming {
            earliest_start: 0,
            earliest_finish: 5,
            latest_start: Some(0),
            latest_finish: Some(5),
            total_slack: Some(0),
            free_slack: Some(0),
        };
        assert!(timing.is_critical());

        let with_slack = ActivityTiming {
            total_slack: Some(2),
            ..timing.clone()
        };
        assert!(!with_slack.is_critical());

        let unknown = ActivityTiming {
            total_slack: None,
            ..timing
        };
        assert!(!unknown.is_critical());
    }
}
