//! Plan metrics: graph complexity, schedule risk, cost/billing/effort series.

use crate::graph::Digraph;
use crate::models::{
    Activity, ActivitySeverity, AllocationType, CompilationResult, CostTotals, DependentActivity,
    Resource, ResourceSchedule, ResourceSeries, ResourceSeriesSet, ResourceSettings, RiskMetrics,
};
use crate::severity::SeverityLookup;

/// Name given to the series of work done without any resource.
pub const UNALLOCATED_SERIES_NAME: &str = "Unallocated";

/// edges - nodes + 2 * connected components.
pub fn cyclomatic_complexity<N, E>(graph: &Digraph<N, E>) -> i32 {
    graph.edge_count() as i32 - graph.node_count() as i32
        + 2 * graph.connected_components() as i32
}

/// Duration-weighted share of severity, relative to a fully critical plan.
///
/// Returns `(criticality_risk, fibonacci_risk)`, both 0 when the plan has no
/// real work.
pub fn risk_scores(activities: &[DependentActivity], table: &[ActivitySeverity]) -> (f64, f64) {
    let lookup = SeverityLookup::new(table.to_vec());
    let mut total_duration = 0.0;
    let mut criticality = 0.0;
    let mut fibonacci = 0.0;
    for activity in activities.iter().map(|da| &da.activity) {
        if activity.is_dummy() {
            continue;
        }
        let duration = activity.duration as f64;
        total_duration += duration;
        criticality += lookup.criticality_weight(activity.total_slack) * duration;
        fibonacci += lookup.fibonacci_weight(activity.total_slack) * duration;
    }
    if total_duration == 0.0 {
        return (0.0, 0.0);
    }
    (
        criticality / (lookup.fully_critical_weight() * total_duration),
        fibonacci / (lookup.fully_critical_fibonacci_weight() * total_duration),
    )
}

pub fn risk_metrics(result: &CompilationResult, table: &[ActivitySeverity]) -> RiskMetrics {
    let (criticality_risk, fibonacci_risk) = risk_scores(&result.dependent_activities, table);
    RiskMetrics {
        criticality_risk,
        fibonacci_risk,
        cyclomatic_complexity: result.cyclomatic_complexity,
    }
}

/// Units of work logged against a resource by its trackers.
pub fn actual_effort(resource: &Resource) -> f64 {
    resource
        .trackers
        .iter()
        .map(|t| t.percentage_worked.clamp(0, 100) as f64 / 100.0)
        .sum()
}

/// Per-time-unit cost, billing and effort for every schedule in `result`.
///
/// Direct and indirect resources are charged at their own rates. Work done
/// without a resource (the pass-through schedule, or activities the
/// allocator could not place) is charged at the settings' default rates and
/// lands in the "other" totals.
pub fn resource_series(result: &CompilationResult, settings: &ResourceSettings) -> ResourceSeriesSet {
    let len = result.duration.max(0) as usize;
    let mut set = ResourceSeriesSet::default();

    for schedule in &result.resource_schedules {
        let series = match &schedule.resource {
            Some(resource) => series_from_schedule(
                schedule,
                Some(resource),
                resource.unit_cost,
                resource.unit_billing,
                len,
            ),
            None => series_from_schedule(
                schedule,
                None,
                settings.default_unit_cost,
                settings.default_unit_billing,
                len,
            ),
        };
        add_totals(&mut set, &series, schedule.resource.is_none());
        set.series.push(series);
    }

    let has_pass_through = result
        .resource_schedules
        .iter()
        .any(|s| s.resource.is_none());
    if !has_pass_through {
        let unallocated: Vec<&Activity> = result
            .dependent_activities
            .iter()
            .map(|da| &da.activity)
            .filter(|a| !a.is_dummy() && a.allocated_to_resources.is_empty())
            .filter(|a| a.earliest_start_time.is_some())
            .collect();
        if !unallocated.is_empty() {
            let series = unallocated_series(&unallocated, settings, len);
            add_totals(&mut set, &series, true);
            set.series.push(series);
        }
    }
    set
}

fn series_from_schedule(
    schedule: &ResourceSchedule,
    resource: Option<&Resource>,
    unit_cost: f64,
    unit_billing: f64,
    len: usize,
) -> ResourceSeries {
    let rate = |bits: &[bool], unit: f64| -> Vec<f64> {
        (0..len)
            .map(|t| if bits.get(t).copied().unwrap_or(false) { unit } else { 0.0 })
            .collect()
    };
    ResourceSeries {
        resource_id: resource.map(|r| r.id),
        name: resource
            .map(|r| r.name.clone())
            .unwrap_or_else(|| UNALLOCATED_SERIES_NAME.to_string()),
        allocation_type: resource.map(|r| r.allocation_type).unwrap_or_default(),
        cost: rate(&schedule.cost_allocation, unit_cost),
        billing: rate(&schedule.billing_allocation, unit_billing),
        effort: rate(&schedule.effort_allocation, 1.0),
    }
}

/// Unplaced activities may overlap, so their charges stack.
fn unallocated_series(activities: &[&Activity], settings: &ResourceSettings, len: usize) -> ResourceSeries {
    let mut series = ResourceSeries {
        resource_id: None,
        name: UNALLOCATED_SERIES_NAME.to_string(),
        allocation_type: AllocationType::Direct,
        cost: vec![0.0; len],
        billing: vec![0.0; len],
        effort: vec![0.0; len],
    };
    for activity in activities {
        let Some(start) = activity.earliest_start_time else {
            continue;
        };
        let finish = activity
            .earliest_finish_time
            .unwrap_or(start + activity.duration);
        for t in start.max(0)..finish.min(len as i32) {
            let t = t as usize;
            if !activity.has_no_cost {
                series.cost[t] += settings.default_unit_cost;
            }
            if !activity.has_no_billing {
                series.billing[t] += settings.default_unit_billing;
            }
            if !activity.has_no_effort {
                series.effort[t] += 1.0;
            }
        }
    }
    series
}

fn add_totals(set: &mut ResourceSeriesSet, series: &ResourceSeries, other: bool) {
    let cost: f64 = series.cost.iter().sum();
    let billing: f64 = series.billing.iter().sum();
    let effort: f64 = series.effort.iter().sum();
    let bucket = |totals: &mut CostTotals, value: f64| {
        if other {
            totals.other += value;
        } else {
            match series.allocation_type {
                AllocationType::Direct => totals.direct += value,
                AllocationType::Indirect => totals.indirect += value,
            }
        }
    };
    bucket(&mut set.cost, cost);
    bucket(&mut set.billing, billing);
    bucket(&mut set.effort, effort);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_severity_table;
    use crate::ids::{Id, IdGenerator};
    use crate::models::{ResourceTracker, ScheduledActivity};

    fn make_activity(id: Id, duration: i32, total_slack: Option<i32>) -> DependentActivity {
        let mut activity = Activity::new(id, format!("a{}", id), duration);
        activity.total_slack = total_slack;
        DependentActivity::new(activity, [])
    }

    fn make_resource(id: Id, allocation_type: AllocationType, unit_cost: f64) -> Resource {
        Resource {
            allocation_type,
            unit_cost,
            unit_billing: unit_cost * 2.0,
            ..Resource::new(id, format!("r{}", id))
        }
    }

    fn schedule(resource: Option<Resource>, bits: Vec<bool>) -> ResourceSchedule {
        ResourceSchedule {
            resource,
            scheduled_activities: vec![ScheduledActivity::default()],
            finish_time: bits.len() as i32,
            activity_allocation: bits.clone(),
            cost_allocation: bits.clone(),
            billing_allocation: bits.clone(),
            effort_allocation: bits,
        }
    }

    #[test]
    fn test_cyclomatic_complexity_chain() {
        let mut g: Digraph<(), ()> = Digraph::new(IdGenerator::default(), IdGenerator::default());
        g.add_node(1, ()).unwrap();
        g.add_node(2, ()).unwrap();
        g.add_edge(1, 2, ()).unwrap();
        assert_eq!(cyclomatic_complexity(&g), 1);
    }

    #[test]
    fn test_cyclomatic_complexity_isolated() {
        let mut g: Digraph<(), ()> = Digraph::new(IdGenerator::default(), IdGenerator::default());
        g.add_node(1, ()).unwrap();
        g.add_node(2, ()).unwrap();
        assert_eq!(cyclomatic_complexity(&g), 2);
    }

    #[test]
    fn test_fully_critical_plan_has_unit_risk() {
        let activities = vec![make_activity(1, 5, Some(0)), make_activity(2, 3, Some(0))];
        let (criticality, fibonacci) = risk_scores(&activities, &default_severity_table());
        assert!((criticality - 1.0).abs() < 1e-9);
        assert!((fibonacci - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_risk_weighs_by_duration() {
        // 10 units critical (weight 4), 10 units with slack 30 (weight 1)
        let activities = vec![
            make_activity(1, 10, Some(0)),
            make_activity(2, 10, Some(30)),
            make_activity(3, 0, Some(50)),
        ];
        let (criticality, fibonacci) = risk_scores(&activities, &default_severity_table());
        assert!((criticality - 50.0 / 80.0).abs() < 1e-9);
        assert!((fibonacci - (890.0 + 210.0) / 1780.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_slack_uses_default_weight() {
        let activities = vec![make_activity(1, 4, None)];
        let (criticality, _) = risk_scores(&activities, &default_severity_table());
        assert!((criticality - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_empty_plan_has_zero_risk() {
        assert_eq!(risk_scores(&[], &default_severity_table()), (0.0, 0.0));
        let dummies = vec![make_activity(1, 0, Some(0))];
        assert_eq!(risk_scores(&dummies, &default_severity_table()), (0.0, 0.0));
    }

    #[test]
    fn test_series_split_by_allocation_type() {
        let result = CompilationResult {
            resource_schedules: vec![
                schedule(
                    Some(make_resource(1, AllocationType::Direct, 10.0)),
                    vec![true, true, false, true],
                ),
                schedule(
                    Some(make_resource(2, AllocationType::Indirect, 1.0)),
                    vec![true, true, true, true],
                ),
            ],
            duration: 4,
            ..Default::default()
        };
        let set = resource_series(&result, &ResourceSettings::default());
        assert_eq!(set.series.len(), 2);
        assert_eq!(set.series[0].cost, vec![10.0, 10.0, 0.0, 10.0]);
        assert_eq!(set.cost.direct, 30.0);
        assert_eq!(set.cost.indirect, 4.0);
        assert_eq!(set.billing.direct, 60.0);
        assert_eq!(set.effort.direct, 3.0);
        assert_eq!(set.cost.other, 0.0);
        assert_eq!(set.cost.total(), 34.0);
    }

    #[test]
    fn test_pass_through_is_charged_at_defaults() {
        let result = CompilationResult {
            resource_schedules: vec![schedule(None, vec![true, false])],
            duration: 2,
            ..Default::default()
        };
        let settings = ResourceSettings {
            default_unit_cost: 7.0,
            default_unit_billing: 9.0,
            ..Default::default()
        };
        let set = resource_series(&result, &settings);
        assert_eq!(set.series[0].name, UNALLOCATED_SERIES_NAME);
        assert_eq!(set.cost.other, 7.0);
        assert_eq!(set.billing.other, 9.0);
        assert_eq!(set.cost.direct, 0.0);
    }

    #[test]
    fn test_unallocated_activities_stack() {
        let mut first = make_activity(1, 2, Some(0));
        first.activity.earliest_start_time = Some(0);
        first.activity.earliest_finish_time = Some(2);
        let mut second = make_activity(2, 1, Some(1));
        second.activity.earliest_start_time = Some(1);
        second.activity.earliest_finish_time = Some(2);
        second.activity.has_no_cost = true;
        let result = CompilationResult {
            dependent_activities: vec![first, second],
            duration: 2,
            ..Default::default()
        };
        let settings = ResourceSettings {
            default_unit_cost: 5.0,
            ..Default::default()
        };
        let set = resource_series(&result, &settings);
        assert_eq!(set.series.len(), 1);
        assert_eq!(set.series[0].cost, vec![5.0, 5.0]);
        assert_eq!(set.series[0].effort, vec![1.0, 2.0]);
        assert_eq!(set.effort.other, 3.0);
    }

    #[test]
    fn test_actual_effort_from_trackers() {
        let mut resource = make_resource(1, AllocationType::Direct, 1.0);
        resource.trackers = vec![
            ResourceTracker {
                time: 0,
                resource_id: 1,
                activity_id: 1,
                percentage_worked: 100,
            },
            ResourceTracker {
                time: 1,
                resource_id: 1,
                activity_id: 1,
                percentage_worked: 50,
            },
        ];
        assert!((actual_effort(&resource) - 1.5).abs() < 1e-9);
    }
}
