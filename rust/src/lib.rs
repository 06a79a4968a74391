//! Activity network compiler for project plans.
//!
//! Turns activities, their dependencies and a resource list into a
//! resource-levelled schedule: earliest/latest times, slack, critical path,
//! per-resource schedules, soft compilation errors and plan metrics. An
//! arrow-diagram record set is produced for renderers.

pub mod arrow;
pub mod calendar;
pub mod compiler;
pub mod config;
pub mod critical_path;
pub mod error;
pub mod graph;
pub mod ids;
pub mod logging;
pub mod metrics;
pub mod models;
#[cfg(feature = "python")]
mod python;
pub mod scenario;
pub mod scheduler;
pub mod severity;

pub use arrow::arrow_graph;
pub use calendar::{ActivityDates, CalendarCalculator, DateTimeCalculator};
pub use compiler::{
    compile, CompilationSnapshot, CompileCoordinator, CompileOutcome, CompileTicket, GraphCompiler,
};
pub use config::{default_severity_table, CompilerConfig};
pub use error::CompilerError;
pub use ids::{Id, IdGenerator};
pub use metrics::{actual_effort, cyclomatic_complexity, resource_series, risk_metrics};
pub use models::{
    Activity, ActivitySeverity, ActivityTracker, AllocationType, ArrowEdge, ArrowGraph, ArrowNode,
    CompilationResult, CostTotals, DashStyle, DependentActivity, EdgeKind, GraphCompilationError,
    GraphCompilationErrorCode, LogicalOperator, Resource, ResourceSchedule, ResourceSeries,
    ResourceSeriesSet, ResourceSettings, ResourceTracker, RiskMetrics, ScheduledActivity,
};
pub use scenario::{build_resource_scenarios, ResourceScenarioBuilder};
pub use severity::SeverityLookup;
