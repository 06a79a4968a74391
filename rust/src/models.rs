//! Core data records exchanged with the compiler.
//!
//! Everything here is plain data: callers build the input records, the
//! compiler fills in the computed fields and returns fresh output records.

#[cfg(feature = "python")]
use pyo3::prelude::*;
use std::collections::BTreeSet;

use crate::ids::Id;

/// How an activity's target resources combine.
#[cfg_attr(feature = "python", pyclass(eq, eq_int))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LogicalOperator {
    /// Every target resource works the activity at the same time.
    #[default]
    And,
    /// Any single target resource may work the activity.
    Or,
}

/// How a resource takes on work.
#[cfg_attr(feature = "python", pyclass(eq, eq_int))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AllocationType {
    /// Bound to one activity at a time.
    #[default]
    Direct,
    /// Overhead: busy whenever any direct resource is busy.
    Indirect,
}

/// Percentage-complete sample for an activity at a time index.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActivityTracker {
    pub time: i32,
    pub activity_id: Id,
    pub percentage_complete: i32,
}

/// Percentage of a time unit a resource spent on an activity.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceTracker {
    pub time: i32,
    pub resource_id: Id,
    pub activity_id: Id,
    pub percentage_worked: i32,
}

/// A unit of work.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Activity {
    pub id: Id,
    pub name: String,
    pub duration: i32,
    pub target_resources: BTreeSet<Id>,
    pub target_resource_operator: LogicalOperator,
    /// Zero-duration activities flagged removable are pure ordering links.
    pub can_be_removed: bool,
    pub has_no_cost: bool,
    pub has_no_billing: bool,
    pub has_no_effort: bool,
    /// "Not before" constraint on the earliest start.
    pub minimum_earliest_start_time: Option<i32>,
    /// "Not after" constraint on the latest finish.
    pub maximum_latest_finish_time: Option<i32>,
    pub trackers: Vec<ActivityTracker>,

    // Computed by the critical path pass; cleared on every compile.
    pub earliest_start_time: Option<i32>,
    pub earliest_finish_time: Option<i32>,
    pub latest_start_time: Option<i32>,
    pub latest_finish_time: Option<i32>,
    pub free_slack: Option<i32>,
    pub total_slack: Option<i32>,
    /// Resources the allocator placed this activity on.
    pub allocated_to_resources: BTreeSet<Id>,
}

impl Activity {
    pub fn new(id: Id, name: impl Into<String>, duration: i32) -> Self {
        Self {
            id,
            name: name.into(),
            duration,
            ..Default::default()
        }
    }

    /// Zero-duration activities only express ordering.
    pub fn is_dummy(&self) -> bool {
        self.duration == 0
    }

    pub fn is_critical(&self) -> bool {
        self.total_slack == Some(0)
    }

    /// Drop everything the previous compilation computed.
    pub fn clear_computed(&mut self) {
        self.earliest_start_time = None;
        self.earliest_finish_time = None;
        self.latest_start_time = None;
        self.latest_finish_time = None;
        self.free_slack = None;
        self.total_slack = None;
        self.allocated_to_resources.clear();
    }

    /// Latest tracked completion percentage, or 0 without samples.
    pub fn percentage_complete(&self) -> i32 {
        self.trackers
            .iter()
            .max_by_key(|t| t.time)
            .map(|t| t.percentage_complete.clamp(0, 100))
            .unwrap_or(0)
    }
}

/// An activity plus the ids it must wait for.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DependentActivity {
    pub activity: Activity,
    /// Predecessor activity ids declared by the user.
    pub dependencies: BTreeSet<Id>,
    /// Predecessors implied by sharing a resource; recomputed on each compile.
    pub resource_dependencies: BTreeSet<Id>,
}

impl DependentActivity {
    pub fn new(activity: Activity, dependencies: impl IntoIterator<Item = Id>) -> Self {
        Self {
            activity,
            dependencies: dependencies.into_iter().collect(),
            resource_dependencies: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> Id {
        self.activity.id
    }

    /// Declared and resource-implied predecessors together.
    pub fn all_dependencies(&self) -> BTreeSet<Id> {
        self.dependencies
            .union(&self.resource_dependencies)
            .copied()
            .collect()
    }
}

/// Someone or something that performs activities.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resource {
    pub id: Id,
    pub name: String,
    /// Explicit targets only take activities that name them.
    pub is_explicit_target: bool,
    pub is_inactive: bool,
    pub allocation_type: AllocationType,
    pub unit_cost: f64,
    pub unit_billing: f64,
    pub display_order: i32,
    pub allocation_order: i32,
    pub trackers: Vec<ResourceTracker>,
}

impl Resource {
    pub fn new(id: Id, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Resource list plus project-wide defaults.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceSettings {
    pub resources: Vec<Resource>,
    /// Rate charged for work done without any resource.
    pub default_unit_cost: f64,
    pub default_unit_billing: f64,
    /// Preview mode: schedule by declared durations only.
    pub are_disabled: bool,
}

/// One row of the severity table.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Debug, PartialEq)]
pub struct ActivitySeverity {
    /// Applies to activities whose total slack is at most this value.
    pub slack_limit: i32,
    pub criticality_weight: f64,
    pub fibonacci_weight: f64,
}

/// An activity placed on a resource's timeline.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScheduledActivity {
    pub id: Id,
    pub name: String,
    pub duration: i32,
    pub start_time: i32,
    pub finish_time: i32,
}

/// The work one resource ends up doing.
///
/// The allocation vectors hold one flag per time unit of the project.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceSchedule {
    /// `None` for the pass-through schedule produced when resources are disabled.
    pub resource: Option<Resource>,
    pub scheduled_activities: Vec<ScheduledActivity>,
    /// Finish of the last entry; 0 with no entries (indirect resources).
    pub finish_time: i32,
    pub activity_allocation: Vec<bool>,
    pub cost_allocation: Vec<bool>,
    pub billing_allocation: Vec<bool>,
    pub effort_allocation: Vec<bool>,
}

impl ResourceSchedule {
    pub fn resource_id(&self) -> Option<Id> {
        self.resource.as_ref().map(|r| r.id)
    }

    /// Number of time units the resource is marked busy.
    pub fn allocated_units(&self) -> usize {
        self.activity_allocation.iter().filter(|b| **b).count()
    }
}

/// Kind of a soft compilation error.
#[cfg_attr(feature = "python", pyclass(eq, eq_int))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GraphCompilationErrorCode {
    MissingDependency,
    CircularDependency,
    InvalidConstraint,
    InvalidResourceTargets,
    UnsatisfiedResourceTarget,
}

impl GraphCompilationErrorCode {
    /// Stable short code shown to users.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingDependency => "P0010",
            Self::CircularDependency => "P0020",
            Self::InvalidConstraint => "P0030",
            Self::InvalidResourceTargets => "P0040",
            Self::UnsatisfiedResourceTarget => "P0050",
        }
    }
}

/// A problem in the plan that still lets compilation produce output.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphCompilationError {
    pub code: GraphCompilationErrorCode,
    pub message: String,
    /// For cycles: the activities in cycle order. Otherwise the activities involved.
    pub activity_ids: Vec<Id>,
}

impl GraphCompilationError {
    pub fn new(code: GraphCompilationErrorCode, message: String, activity_ids: Vec<Id>) -> Self {
        Self {
            code,
            message,
            activity_ids,
        }
    }
}

/// Output of one compile request.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompilationResult {
    pub dependent_activities: Vec<DependentActivity>,
    pub resource_schedules: Vec<ResourceSchedule>,
    pub compilation_errors: Vec<GraphCompilationError>,
    pub cyclomatic_complexity: i32,
    pub duration: i32,
}

impl CompilationResult {
    pub fn has_errors(&self) -> bool {
        !self.compilation_errors.is_empty()
    }

    pub fn has_error(&self, code: GraphCompilationErrorCode) -> bool {
        self.compilation_errors.iter().any(|e| e.code == code)
    }

    pub fn activity(&self, id: Id) -> Option<&Activity> {
        self.dependent_activities
            .iter()
            .map(|da| &da.activity)
            .find(|a| a.id == id)
    }

    /// Ids of zero-slack activities in ascending order.
    pub fn critical_activity_ids(&self) -> Vec<Id> {
        let mut ids: Vec<Id> = self
            .dependent_activities
            .iter()
            .filter(|da| da.activity.is_critical())
            .map(|da| da.id())
            .collect();
        ids.sort_unstable();
        ids
    }
}

/// Line style of an arrow-diagram edge.
#[cfg_attr(feature = "python", pyclass(eq, eq_int))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DashStyle {
    Solid,
    Dashed,
}

/// Semantic category of an arrow-diagram edge.
#[cfg_attr(feature = "python", pyclass(eq, eq_int))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Normal,
    Critical,
    Dummy,
    CriticalDummy,
}

/// Event node of the arrow diagram.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArrowNode {
    pub id: Id,
    pub earliest_finish_time: Option<i32>,
    pub latest_finish_time: Option<i32>,
    /// "earliest|latest", or "?" for unknown values.
    pub label: String,
}

/// Activity edge of the arrow diagram.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Debug, PartialEq)]
pub struct ArrowEdge {
    pub id: Id,
    /// Activity id for real activities; `None` for synthesized dummies.
    pub activity_id: Option<Id>,
    pub name: String,
    pub source_node_id: Id,
    pub target_node_id: Id,
    pub duration: i32,
    pub total_slack: Option<i32>,
    pub kind: EdgeKind,
    pub dash_style: DashStyle,
    pub weight: f64,
}

/// Activity-on-arc rendition of a compiled plan, ready for a diagram serializer.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArrowGraph {
    pub nodes: Vec<ArrowNode>,
    pub edges: Vec<ArrowEdge>,
}

/// Per-time-unit series for one resource.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceSeries {
    /// `None` for work done without a resource.
    pub resource_id: Option<Id>,
    pub name: String,
    pub allocation_type: AllocationType,
    pub cost: Vec<f64>,
    pub billing: Vec<f64>,
    pub effort: Vec<f64>,
}

/// Totals split by who carried the work.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CostTotals {
    pub direct: f64,
    pub indirect: f64,
    pub other: f64,
}

impl CostTotals {
    pub fn total(&self) -> f64 {
        self.direct + self.indirect + self.other
    }
}

/// Aggregated cost, billing and effort for a compiled plan.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceSeriesSet {
    pub series: Vec<ResourceSeries>,
    pub cost: CostTotals,
    pub billing: CostTotals,
    pub effort: CostTotals,
}

/// Risk scores derived from the severity table.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RiskMetrics {
    pub criticality_risk: f64,
    pub fibonacci_risk: f64,
    pub cyclomatic_complexity: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_computed() {
        let mut activity = Activity::new(1, "a", 5);
        activity.earliest_start_time = Some(0);
        activity.total_slack = Some(0);
        activity.allocated_to_resources.insert(3);
        assert!(activity.is_critical());

        activity.clear_computed();
        assert_eq!(activity.earliest_start_time, None);
        assert_eq!(activity.total_slack, None);
        assert!(activity.allocated_to_resources.is_empty());
        assert!(!activity.is_critical());
    }

    #[test]
    fn test_percentage_complete_uses_latest_sample() {
        let mut activity = Activity::new(1, "a", 5);
        assert_eq!(activity.percentage_complete(), 0);
        activity.trackers = vec![
            ActivityTracker {
                time: 3,
                activity_id: 1,
                percentage_complete: 60,
            },
            ActivityTracker {
                time: 1,
                activity_id: 1,
                percentage_complete: 20,
            },
        ];
        assert_eq!(activity.percentage_complete(), 60);
    }

    #[test]
    fn test_all_dependencies_union() {
        let mut da = DependentActivity::new(Activity::new(3, "c", 1), [1]);
        da.resource_dependencies.insert(2);
        da.resource_dependencies.insert(1);
        assert_eq!(da.all_dependencies(), BTreeSet::from([1, 2]));
    }

    #[test]
    fn test_error_codes_are_distinct() {
        let codes = [
            GraphCompilationErrorCode::MissingDependency,
            GraphCompilationErrorCode::CircularDependency,
            GraphCompilationErrorCode::InvalidConstraint,
            GraphCompilationErrorCode::InvalidResourceTargets,
            GraphCompilationErrorCode::UnsatisfiedResourceTarget,
        ];
        let unique: BTreeSet<&str> = codes.iter().map(|c| c.code()).collect();
        assert_eq!(unique.len(), codes.len());
    }
}
