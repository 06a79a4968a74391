//! Python bindings.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use chrono::NaiveDate;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::arrow;
use crate::calendar::{ActivityDates, CalendarCalculator};
use crate::compiler;
use crate::config::{default_severity_table, CompilerConfig};
use crate::error::CompilerError;
use crate::ids::Id;
use crate::metrics;
use crate::models::{
    Activity, ActivitySeverity, ActivityTracker, AllocationType, ArrowEdge, ArrowGraph, ArrowNode,
    CompilationResult, CostTotals, DashStyle, DependentActivity, EdgeKind, GraphCompilationError,
    GraphCompilationErrorCode, LogicalOperator, Resource, ResourceSchedule, ResourceSeries,
    ResourceSeriesSet, ResourceSettings, ResourceTracker, RiskMetrics, ScheduledActivity,
};
use crate::scenario;

impl From<CompilerError> for PyErr {
    fn from(err: CompilerError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

#[pymethods]
impl ActivityTracker {
    #[new]
    fn py_new(time: i32, activity_id: Id, percentage_complete: i32) -> Self {
        Self {
            time,
            activity_id,
            percentage_complete,
        }
    }
}

#[pymethods]
impl ResourceTracker {
    #[new]
    fn py_new(time: i32, resource_id: Id, activity_id: Id, percentage_worked: i32) -> Self {
        Self {
            time,
            resource_id,
            activity_id,
            percentage_worked,
        }
    }
}

#[pymethods]
impl Activity {
    #[new]
    #[pyo3(signature = (
        id,
        name,
        duration,
        target_resources=Vec::new(),
        target_resource_operator=LogicalOperator::And,
        can_be_removed=false,
        has_no_cost=false,
        has_no_billing=false,
        has_no_effort=false,
        minimum_earliest_start_time=None,
        maximum_latest_finish_time=None,
        trackers=Vec::new()
    ))]
    #[allow(clippy::too_many_arguments)]
    fn py_new(
        id: Id,
        name: String,
        duration: i32,
        target_resources: Vec<Id>,
        target_resource_operator: LogicalOperator,
        can_be_removed: bool,
        has_no_cost: bool,
        has_no_billing: bool,
        has_no_effort: bool,
        minimum_earliest_start_time: Option<i32>,
        maximum_latest_finish_time: Option<i32>,
        trackers: Vec<ActivityTracker>,
    ) -> Self {
        Self {
            target_resources: target_resources.into_iter().collect(),
            target_resource_operator,
            can_be_removed,
            has_no_cost,
            has_no_billing,
            has_no_effort,
            minimum_earliest_start_time,
            maximum_latest_finish_time,
            trackers,
            ..Activity::new(id, name, duration)
        }
    }

    #[getter(is_critical)]
    fn py_is_critical(&self) -> bool {
        self.is_critical()
    }

    #[getter(percentage_complete)]
    fn py_percentage_complete(&self) -> i32 {
        self.percentage_complete()
    }

    fn __repr__(&self) -> String {
        format!(
            "Activity(id={}, name={:?}, duration={}, earliest_start_time={:?}, total_slack={:?})",
            self.id, self.name, self.duration, self.earliest_start_time, self.total_slack
        )
    }
}

#[pymethods]
impl DependentActivity {
    #[new]
    #[pyo3(signature = (activity, dependencies=Vec::new()))]
    fn py_new(activity: Activity, dependencies: Vec<Id>) -> Self {
        Self::new(activity, dependencies)
    }

    fn __repr__(&self) -> String {
        format!(
            "DependentActivity(id={}, dependencies={:?}, resource_dependencies={:?})",
            self.id(),
            self.dependencies,
            self.resource_dependencies
        )
    }
}

#[pymethods]
impl Resource {
    #[new]
    #[pyo3(signature = (
        id,
        name,
        is_explicit_target=false,
        is_inactive=false,
        allocation_type=AllocationType::Direct,
        unit_cost=0.0,
        unit_billing=0.0,
        display_order=0,
        allocation_order=0,
        trackers=Vec::new()
    ))]
    #[allow(clippy::too_many_arguments)]
    fn py_new(
        id: Id,
        name: String,
        is_explicit_target: bool,
        is_inactive: bool,
        allocation_type: AllocationType,
        unit_cost: f64,
        unit_billing: f64,
        display_order: i32,
        allocation_order: i32,
        trackers: Vec<ResourceTracker>,
    ) -> Self {
        Self {
            is_explicit_target,
            is_inactive,
            allocation_type,
            unit_cost,
            unit_billing,
            display_order,
            allocation_order,
            trackers,
            ..Resource::new(id, name)
        }
    }

    #[getter(actual_effort)]
    fn py_actual_effort(&self) -> f64 {
        metrics::actual_effort(self)
    }

    fn __repr__(&self) -> String {
        format!(
            "Resource(id={}, name={:?}, explicit={}, inactive={}, type={:?})",
            self.id, self.name, self.is_explicit_target, self.is_inactive, self.allocation_type
        )
    }
}

#[pymethods]
impl ResourceSettings {
    #[new]
    #[pyo3(signature = (resources=Vec::new(), default_unit_cost=0.0, default_unit_billing=0.0, are_disabled=false))]
    fn py_new(
        resources: Vec<Resource>,
        default_unit_cost: f64,
        default_unit_billing: f64,
        are_disabled: bool,
    ) -> Self {
        Self {
            resources,
            default_unit_cost,
            default_unit_billing,
            are_disabled,
        }
    }
}

#[pymethods]
impl ActivitySeverity {
    #[new]
    fn py_new(slack_limit: i32, criticality_weight: f64, fibonacci_weight: f64) -> Self {
        Self {
            slack_limit,
            criticality_weight,
            fibonacci_weight,
        }
    }
}

#[pymethods]
impl CompilerConfig {
    #[new]
    #[pyo3(signature = (verbosity=0, reduce_transitive_edges=true, severity_table=None))]
    fn py_new(
        verbosity: u8,
        reduce_transitive_edges: bool,
        severity_table: Option<Vec<ActivitySeverity>>,
    ) -> Self {
        Self {
            verbosity,
            reduce_transitive_edges,
            severity_table: severity_table.unwrap_or_else(default_severity_table),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "CompilerConfig(verbosity={}, reduce_transitive_edges={}, severity_table_len={})",
            self.verbosity,
            self.reduce_transitive_edges,
            self.severity_table.len()
        )
    }
}

#[pymethods]
impl CalendarCalculator {
    #[new]
    #[pyo3(signature = (business_days_only=false))]
    fn py_new(business_days_only: bool) -> Self {
        Self { business_days_only }
    }
}

#[pymethods]
impl GraphCompilationError {
    #[getter(short_code)]
    fn py_short_code(&self) -> &'static str {
        self.code.code()
    }

    fn __repr__(&self) -> String {
        format!("GraphCompilationError({}: {})", self.code.code(), self.message)
    }
}

#[pymethods]
impl CompilationResult {
    #[pyo3(name = "activity_dates")]
    fn py_activity_dates(
        &self,
        project_start: NaiveDate,
        calculator: CalendarCalculator,
    ) -> Vec<ActivityDates> {
        self.activity_dates(project_start, &calculator)
    }

    fn __repr__(&self) -> String {
        format!(
            "CompilationResult(activities={}, duration={}, errors={})",
            self.dependent_activities.len(),
            self.duration,
            self.compilation_errors.len()
        )
    }
}

/// Compile a project plan.
///
/// # Raises
/// * ValueError for duplicate ids, negative durations or unknown target resources
#[pyfunction]
#[pyo3(signature = (activities, settings, config=None))]
fn compile_project(
    py: Python<'_>,
    activities: Vec<DependentActivity>,
    settings: ResourceSettings,
    config: Option<CompilerConfig>,
) -> PyResult<CompilationResult> {
    let config = config.unwrap_or_default();
    let result = py.allow_threads(|| compiler::compile(&activities, &settings, &config))?;
    Ok(result)
}

/// One resource-settings variation per non-explicit resource.
#[pyfunction]
fn build_resource_scenarios(settings: ResourceSettings) -> PyResult<Vec<ResourceSettings>> {
    Ok(scenario::build_resource_scenarios(&settings)?)
}

/// Arrow diagram records for a compiled plan.
#[pyfunction]
#[pyo3(signature = (result, config=None))]
fn arrow_graph(result: CompilationResult, config: Option<CompilerConfig>) -> PyResult<ArrowGraph> {
    Ok(arrow::arrow_graph(&result, &config.unwrap_or_default())?)
}

/// Cost, billing and effort series for a compiled plan.
#[pyfunction]
fn resource_series(result: CompilationResult, settings: ResourceSettings) -> ResourceSeriesSet {
    metrics::resource_series(&result, &settings)
}

/// Criticality and Fibonacci risk for a compiled plan.
#[pyfunction]
#[pyo3(signature = (result, severity_table=None))]
fn risk_metrics(
    result: CompilationResult,
    severity_table: Option<Vec<ActivitySeverity>>,
) -> RiskMetrics {
    let table = severity_table.unwrap_or_else(default_severity_table);
    metrics::risk_metrics(&result, &table)
}

/// The projectplan_rust Python module.
#[pymodule]
fn projectplan_rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Enums
    m.add_class::<LogicalOperator>()?;
    m.add_class::<AllocationType>()?;
    m.add_class::<GraphCompilationErrorCode>()?;
    m.add_class::<DashStyle>()?;
    m.add_class::<EdgeKind>()?;

    // Input records
    m.add_class::<ActivityTracker>()?;
    m.add_class::<ResourceTracker>()?;
    m.add_class::<Activity>()?;
    m.add_class::<DependentActivity>()?;
    m.add_class::<Resource>()?;
    m.add_class::<ResourceSettings>()?;
    m.add_class::<ActivitySeverity>()?;
    m.add_class::<CompilerConfig>()?;
    m.add_class::<CalendarCalculator>()?;

    // Output records
    m.add_class::<ScheduledActivity>()?;
    m.add_class::<ResourceSchedule>()?;
    m.add_class::<GraphCompilationError>()?;
    m.add_class::<CompilationResult>()?;
    m.add_class::<ActivityDates>()?;
    m.add_class::<ArrowNode>()?;
    m.add_class::<ArrowEdge>()?;
    m.add_class::<ArrowGraph>()?;
    m.add_class::<ResourceSeries>()?;
    m.add_class::<CostTotals>()?;
    m.add_class::<ResourceSeriesSet>()?;
    m.add_class::<RiskMetrics>()?;

    // Operations
    m.add_function(wrap_pyfunction!(compile_project, m)?)?;
    m.add_function(wrap_pyfunction!(build_resource_scenarios, m)?)?;
    m.add_function(wrap_pyfunction!(arrow_graph, m)?)?;
    m.add_function(wrap_pyfunction!(resource_series, m)?)?;
    m.add_function(wrap_pyfunction!(risk_metrics, m)?)?;

    Ok(())
}
