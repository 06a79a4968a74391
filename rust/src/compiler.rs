//! End-to-end compilation of a project plan.
//!
//! A compile validates the input, builds the dependency graph, runs the
//! critical path, allocates resources, folds the resulting resource
//! dependencies back into the graph and runs the critical path again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::arrow::arrow_graph;
use crate::config::CompilerConfig;
use crate::critical_path::{apply_timings, calculate_critical_path};
use crate::error::CompilerError;
use crate::graph::validation::{check_constraints, check_resource_targets, validate_input};
use crate::graph::{transitive_reduction, DependencyGraphBuilder};
use crate::ids::IdGenerator;
use crate::metrics::{cyclomatic_complexity, resource_series, risk_metrics};
use crate::models::{
    ArrowGraph, CompilationResult, DependentActivity, ResourceSeriesSet, ResourceSettings,
    RiskMetrics,
};
use crate::scheduler::ResourceAllocator;
use crate::{log_decision, log_phase};

/// Compiles activities against one set of resource settings.
pub struct GraphCompiler<'a> {
    settings: &'a ResourceSettings,
    config: &'a CompilerConfig,
}

impl<'a> GraphCompiler<'a> {
    pub fn new(settings: &'a ResourceSettings, config: &'a CompilerConfig) -> Self {
        Self { settings, config }
    }

    /// Compile `activities`.
    ///
    /// The input is left untouched; the result carries fresh copies with
    /// every computed field recalculated. Soft problems are reported in
    /// [`CompilationResult::compilation_errors`]; malformed input is an `Err`.
    pub fn compile(
        &self,
        activities: &[DependentActivity],
    ) -> Result<CompilationResult, CompilerError> {
        let verbosity = self.config.verbosity;
        validate_input(activities, self.settings)?;

        let mut working: Vec<DependentActivity> = activities.to_vec();
        for da in working.iter_mut() {
            da.activity.clear_computed();
            da.resource_dependencies.clear();
        }

        log_phase!(verbosity, "building dependency graph for {} activities", working.len());
        let built = DependencyGraphBuilder::new(IdGenerator::default(), IdGenerator::default())
            .with_verbosity(verbosity)
            .build(&working)?;
        let mut errors = built.errors.clone();
        let target_error = check_resource_targets(&working, self.settings);

        log_phase!(verbosity, "critical path: first pass");
        let first = calculate_critical_path(&built.graph, &working, verbosity)?;
        apply_timings(&mut working, &first);

        if !built.is_acyclic() {
            errors.extend(check_constraints(&working));
            errors.extend(target_error);
            log_phase!(
                verbosity,
                "{} cycles found, skipping resource allocation",
                built.cycles.len()
            );
            return Ok(CompilationResult {
                dependent_activities: working,
                resource_schedules: Vec::new(),
                compilation_errors: errors,
                cyclomatic_complexity: cyclomatic_complexity(&built.graph),
                duration: first.duration,
            });
        }

        log_phase!(verbosity, "allocating resources");
        let allocation = ResourceAllocator::new(self.settings, verbosity)
            .allocate(&working, &first.topological_order)?;
        for da in working.iter_mut() {
            let id = da.id();
            da.resource_dependencies = allocation
                .resource_dependencies
                .get(&id)
                .cloned()
                .unwrap_or_default();
            da.activity.allocated_to_resources =
                allocation.allocations.get(&id).cloned().unwrap_or_default();
        }

        log_phase!(verbosity, "critical path: resource-allocated pass");
        let allocated = DependencyGraphBuilder::new(IdGenerator::default(), IdGenerator::default())
            .with_resource_dependencies(true)
            .with_verbosity(verbosity)
            .build(&working)?;
        if !allocated.is_acyclic() {
            return Err(CompilerError::InvalidGraph(
                "resource dependencies introduced a cycle".to_string(),
            ));
        }
        let second = calculate_critical_path(&allocated.graph, &working, verbosity)?;
        apply_timings(&mut working, &second);

        // levelled finishes are never earlier than the unlevelled ones
        errors.extend(check_constraints(&working));
        errors.extend(target_error);
        errors.extend(allocation.errors.iter().cloned());

        let complexity = if self.config.reduce_transitive_edges {
            let reduced = transitive_reduction(&allocated.graph)?;
            log_decision!(
                verbosity,
                "transitive reduction kept {} of {} edges",
                reduced.edge_count(),
                allocated.graph.edge_count()
            );
            cyclomatic_complexity(&reduced)
        } else {
            cyclomatic_complexity(&allocated.graph)
        };

        log_phase!(
            verbosity,
            "compiled: duration {}, {} soft errors",
            second.duration,
            errors.len()
        );
        Ok(CompilationResult {
            dependent_activities: working,
            resource_schedules: allocation.schedules,
            compilation_errors: errors,
            cyclomatic_complexity: complexity,
            duration: second.duration,
        })
    }
}

/// Compile with the given settings and configuration.
pub fn compile(
    activities: &[DependentActivity],
    settings: &ResourceSettings,
    config: &CompilerConfig,
) -> Result<CompilationResult, CompilerError> {
    GraphCompiler::new(settings, config).compile(activities)
}

/// Everything a viewer needs from one compile.
#[derive(Clone, Debug)]
pub struct CompilationSnapshot {
    /// Ticket the snapshot was compiled for.
    pub generation: u64,
    pub result: CompilationResult,
    pub arrow_graph: ArrowGraph,
    pub series: ResourceSeriesSet,
    pub risk: RiskMetrics,
}

/// Handle for one compile request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct CompileTicket(pub u64);

#[derive(Clone, Debug)]
pub enum CompileOutcome {
    Published(Arc<CompilationSnapshot>),
    /// A newer request was issued; the work was discarded.
    Superseded { ticket: u64, latest: u64 },
}

/// Serializes compiles and publishes only the newest request's snapshot.
///
/// Callers take a ticket with [`request`](Self::request) whenever the plan
/// changes, then compile with it. A compile whose ticket is no longer the
/// latest never replaces the published snapshot.
pub struct CompileCoordinator {
    config: CompilerConfig,
    latest_ticket: AtomicU64,
    published: Mutex<Option<Arc<CompilationSnapshot>>>,
}

impl CompileCoordinator {
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            config,
            latest_ticket: AtomicU64::new(0),
            published: Mutex::new(None),
        }
    }

    pub fn request(&self) -> CompileTicket {
        CompileTicket(self.latest_ticket.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn is_latest(&self, ticket: CompileTicket) -> bool {
        self.latest_ticket.load(Ordering::SeqCst) == ticket.0
    }

    fn superseded(&self, ticket: CompileTicket) -> CompileOutcome {
        CompileOutcome::Superseded {
            ticket: ticket.0,
            latest: self.latest_ticket.load(Ordering::SeqCst),
        }
    }

    /// Compile for `ticket` and publish the snapshot if it is still current.
    pub fn compile(
        &self,
        ticket: CompileTicket,
        activities: &[DependentActivity],
        settings: &ResourceSettings,
    ) -> Result<CompileOutcome, CompilerError> {
        let mut published = self
            .published
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !self.is_latest(ticket) {
            return Ok(self.superseded(ticket));
        }

        let result = compile(activities, settings, &self.config)?;
        let snapshot = CompilationSnapshot {
            generation: ticket.0,
            arrow_graph: arrow_graph(&result, &self.config)?,
            series: resource_series(&result, settings),
            risk: risk_metrics(&result, &self.config.severity_table),
            result,
        };

        if !self.is_latest(ticket) {
            return Ok(self.superseded(ticket));
        }
        let snapshot = Arc::new(snapshot);
        *published = Some(Arc::clone(&snapshot));
        Ok(CompileOutcome::Published(snapshot))
    }

    /// The most recently published snapshot.
    pub fn latest(&self) -> Option<Arc<CompilationSnapshot>> {
        self.published
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Id;
    use crate::models::{
        Activity, AllocationType, GraphCompilationErrorCode, LogicalOperator, Resource,
    };
    use std::collections::BTreeSet;
    use std::thread;

    fn make_activity(id: Id, duration: i32, deps: &[Id]) -> DependentActivity {
        DependentActivity::new(Activity::new(id, format!("a{}", id), duration), deps.iter().copied())
    }

    fn make_resource(id: Id, explicit: bool) -> Resource {
        Resource {
            is_explicit_target: explicit,
            allocation_order: id,
            display_order: id,
            unit_cost: 1.0,
            ..Resource::new(id, format!("r{}", id))
        }
    }

    fn settings(resources: Vec<Resource>) -> ResourceSettings {
        ResourceSettings {
            resources,
            ..Default::default()
        }
    }

    fn run(activities: &[DependentActivity], settings: &ResourceSettings) -> CompilationResult {
        compile(activities, settings, &CompilerConfig::default()).unwrap()
    }

    #[test]
    fn test_two_activity_chain() {
        let result = run(
            &[make_activity(1, 5, &[]), make_activity(2, 3, &[1])],
            &ResourceSettings::default(),
        );
        let a = result.activity(1).unwrap();
        let b = result.activity(2).unwrap();
        assert_eq!((a.earliest_start_time, a.earliest_finish_time), (Some(0), Some(5)));
        assert_eq!((b.earliest_start_time, b.earliest_finish_time), (Some(5), Some(8)));
        assert!(a.is_critical());
        assert!(b.is_critical());
        assert_eq!(result.duration, 8);
        assert_eq!(result.cyclomatic_complexity, 1);
        assert!(!result.has_errors());
    }

    #[test]
    fn test_independent_activities() {
        let result = run(
            &[make_activity(1, 2, &[]), make_activity(2, 4, &[])],
            &ResourceSettings::default(),
        );
        assert!(!result.has_errors());
        assert_eq!(result.cyclomatic_complexity, 2);
        assert_eq!(result.duration, 4);
        assert_eq!(result.activity(1).unwrap().total_slack, Some(2));
    }

    #[test]
    fn test_disabled_resources_round_trip() {
        let mut disabled = settings(vec![make_resource(1, false)]);
        disabled.are_disabled = true;
        let result = run(
            &[make_activity(1, 2, &[]), make_activity(2, 7, &[]), make_activity(3, 4, &[])],
            &disabled,
        );
        assert_eq!(result.duration, 7);
        assert_eq!(result.resource_schedules.len(), 1);
        let ids: BTreeSet<Id> = result.resource_schedules[0]
            .scheduled_activities
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, BTreeSet::from([1, 2, 3]));
    }

    #[test]
    fn test_single_resource_levels_work() {
        let result = run(
            &[make_activity(1, 5, &[]), make_activity(2, 3, &[])],
            &settings(vec![make_resource(1, false)]),
        );
        assert_eq!(result.duration, 8);
        assert_eq!(result.resource_schedules.len(), 1);
        assert_eq!(result.resource_schedules[0].scheduled_activities.len(), 2);

        let first = &result.dependent_activities[1];
        let second = &result.dependent_activities[0];
        assert_eq!(first.activity.earliest_start_time, Some(0));
        assert_eq!(second.activity.earliest_start_time, Some(3));
        assert_eq!(second.resource_dependencies, BTreeSet::from([2]));
        assert_eq!(second.activity.allocated_to_resources, BTreeSet::from([1]));
        assert_eq!(result.critical_activity_ids(), vec![1, 2]);
        assert_eq!(result.cyclomatic_complexity, 1);
    }

    #[test]
    fn test_missing_dependency_is_soft() {
        let result = run(&[make_activity(1, 2, &[99])], &ResourceSettings::default());
        assert!(result.has_error(GraphCompilationErrorCode::MissingDependency));
        assert_eq!(result.compilation_errors[0].code.code(), "P0010");
        assert_eq!(result.duration, 2);
    }

    #[test]
    fn test_cycle_is_reported_and_blocks_downstream() {
        let result = run(
            &[
                make_activity(1, 2, &[]),
                make_activity(2, 1, &[1, 3]),
                make_activity(3, 1, &[2]),
                make_activity(4, 1, &[3]),
            ],
            &settings(vec![make_resource(1, false)]),
        );
        let cycle = result
            .compilation_errors
            .iter()
            .find(|e| e.code == GraphCompilationErrorCode::CircularDependency)
            .unwrap();
        assert_eq!(cycle.activity_ids, vec![2, 3]);
        assert_eq!(result.activity(1).unwrap().earliest_finish_time, Some(2));
        assert_eq!(result.activity(4).unwrap().earliest_start_time, None);
        assert!(result.resource_schedules.is_empty());
    }

    #[test]
    fn test_soft_errors_are_co_reported() {
        let mut capped = make_activity(2, 5, &[]);
        capped.activity.maximum_latest_finish_time = Some(3);
        let result = run(
            &[make_activity(1, 2, &[42]), capped],
            &settings(vec![make_resource(1, true)]),
        );
        let codes: Vec<GraphCompilationErrorCode> =
            result.compilation_errors.iter().map(|e| e.code).collect();
        assert_eq!(
            codes,
            vec![
                GraphCompilationErrorCode::MissingDependency,
                GraphCompilationErrorCode::InvalidConstraint,
                GraphCompilationErrorCode::InvalidResourceTargets,
            ]
        );
    }

    #[test]
    fn test_deadline_broken_by_predecessors_is_reported() {
        let mut capped = make_activity(2, 3, &[1]);
        capped.activity.maximum_latest_finish_time = Some(6);
        let result = run(&[make_activity(1, 5, &[]), capped], &ResourceSettings::default());
        let error = result
            .compilation_errors
            .iter()
            .find(|e| e.code == GraphCompilationErrorCode::InvalidConstraint)
            .unwrap();
        assert_eq!(error.activity_ids, vec![2]);
        assert_eq!(result.activity(2).unwrap().total_slack, Some(-2));
    }

    #[test]
    fn test_deadline_broken_by_levelling_is_reported() {
        let mut capped = make_activity(2, 3, &[]);
        capped.activity.maximum_latest_finish_time = Some(4);
        // the shorter activity 1 takes the resource first
        let activities = [make_activity(1, 2, &[]), capped];

        let unlevelled = run(&activities, &ResourceSettings::default());
        assert!(!unlevelled.has_error(GraphCompilationErrorCode::InvalidConstraint));

        let levelled = run(&activities, &settings(vec![make_resource(1, false)]));
        assert!(levelled.has_error(GraphCompilationErrorCode::InvalidConstraint));
        assert_eq!(levelled.duration, 5);
    }

    #[test]
    fn test_unsatisfied_target_runs_unconstrained() {
        let mut overhead = make_resource(2, true);
        overhead.allocation_type = AllocationType::Indirect;
        let mut targeted = make_activity(1, 3, &[]);
        targeted.activity.target_resources = BTreeSet::from([2]);
        targeted.activity.target_resource_operator = LogicalOperator::Or;
        let result = run(&[targeted], &settings(vec![make_resource(1, false), overhead]));
        assert!(result.has_error(GraphCompilationErrorCode::UnsatisfiedResourceTarget));
        assert_eq!(result.duration, 3);
        assert!(result.activity(1).unwrap().allocated_to_resources.is_empty());
    }

    #[test]
    fn test_fatal_input_errors() {
        let duplicate = [make_activity(1, 1, &[]), make_activity(1, 2, &[])];
        assert_eq!(
            compile(&duplicate, &ResourceSettings::default(), &CompilerConfig::default()),
            Err(CompilerError::DuplicateActivityId(1))
        );

        let negative = [make_activity(1, -1, &[])];
        assert!(matches!(
            compile(&negative, &ResourceSettings::default(), &CompilerConfig::default()),
            Err(CompilerError::NegativeDuration { activity_id: 1, .. })
        ));

        let mut unknown = make_activity(1, 1, &[]);
        unknown.activity.target_resources = BTreeSet::from([5]);
        assert_eq!(
            compile(&[unknown], &ResourceSettings::default(), &CompilerConfig::default()),
            Err(CompilerError::UnknownTargetResource {
                activity_id: 1,
                resource_id: 5
            })
        );
    }

    #[test]
    fn test_recompile_is_stable() {
        let resources = settings(vec![make_resource(1, false), make_resource(2, false)]);
        let activities = [
            make_activity(1, 4, &[]),
            make_activity(2, 2, &[]),
            make_activity(3, 3, &[1, 2]),
            make_activity(4, 1, &[]),
        ];
        let first = run(&activities, &resources);
        let second = run(&first.dependent_activities, &resources);
        assert_eq!(first, second);
    }

    #[test]
    fn test_reduction_lowers_complexity() {
        let activities = [
            make_activity(1, 1, &[]),
            make_activity(2, 1, &[1]),
            make_activity(3, 1, &[1, 2]),
        ];
        let reduced = run(&activities, &ResourceSettings::default());
        let config = CompilerConfig {
            reduce_transitive_edges: false,
            ..Default::default()
        };
        let full = compile(&activities, &ResourceSettings::default(), &config).unwrap();
        assert_eq!(reduced.cyclomatic_complexity, 1);
        assert_eq!(full.cyclomatic_complexity, 2);
    }

    #[test]
    fn test_coordinator_discards_superseded_compile() {
        let coordinator = CompileCoordinator::new(CompilerConfig::default());
        let activities = [make_activity(1, 5, &[]), make_activity(2, 3, &[1])];
        let resources = ResourceSettings::default();

        let stale = coordinator.request();
        let fresh = coordinator.request();
        let outcome = coordinator.compile(stale, &activities, &resources).unwrap();
        assert!(matches!(
            outcome,
            CompileOutcome::Superseded {
                ticket: 1,
                latest: 2
            }
        ));
        assert!(coordinator.latest().is_none());

        let outcome = coordinator.compile(fresh, &activities, &resources).unwrap();
        let CompileOutcome::Published(snapshot) = outcome else {
            panic!("expected a published snapshot");
        };
        assert_eq!(snapshot.generation, 2);
        assert_eq!(snapshot.result.duration, 8);
        assert_eq!(snapshot.arrow_graph.edges.len(), 2);
        assert!((snapshot.risk.criticality_risk - 1.0).abs() < 1e-9);
        assert_eq!(coordinator.latest().unwrap().generation, 2);
    }

    #[test]
    fn test_coordinator_publishes_newest_across_threads() {
        let coordinator = Arc::new(CompileCoordinator::new(CompilerConfig::default()));
        let handles: Vec<_> = (1..=8)
            .map(|n| {
                let coordinator = Arc::clone(&coordinator);
                thread::spawn(move || {
                    let activities: Vec<DependentActivity> =
                        (1..=n).map(|id| make_activity(id, id, &[])).collect();
                    let ticket = coordinator.request();
                    coordinator
                        .compile(ticket, &activities, &ResourceSettings::default())
                        .unwrap()
                })
            })
            .collect();
        let published = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|o| matches!(o, CompileOutcome::Published(_)))
            .count();
        assert!(published >= 1);
        assert_eq!(coordinator.latest().unwrap().generation, 8);
    }
}
