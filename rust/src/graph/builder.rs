//! Dependency graph construction from dependent-activity records.

use rustc_hash::FxHashSet;

use crate::error::CompilerError;
use crate::ids::{Id, IdGenerator};
use crate::models::{DependentActivity, GraphCompilationError};
use crate::{log_debug, log_decision, log_phase};

use super::arena::Digraph;
use super::validation::{check_missing_dependencies, circular_dependency_error};

/// Activity-on-node graph: node ids are activity ids, edges are precedence links.
pub type VertexGraph = Digraph<(), ()>;

/// A built graph plus the structural problems found while building it.
#[derive(Clone, Debug)]
pub struct DependencyGraph {
    pub graph: VertexGraph,
    pub errors: Vec<GraphCompilationError>,
    /// Each cycle as activity ids in precedence order.
    pub cycles: Vec<Vec<Id>>,
}

impl DependencyGraph {
    pub fn is_acyclic(&self) -> bool {
        self.cycles.is_empty()
    }
}

/// Builds a [`DependencyGraph`] from dependent activities.
#[derive(Clone, Debug)]
pub struct DependencyGraphBuilder {
    node_ids: IdGenerator,
    edge_ids: IdGenerator,
    include_resource_dependencies: bool,
    verbosity: u8,
}

impl DependencyGraphBuilder {
    pub fn new(node_ids: IdGenerator, edge_ids: IdGenerator) -> Self {
        Self {
            node_ids,
            edge_ids,
            include_resource_dependencies: false,
            verbosity: 0,
        }
    }

    /// Also link activities to their resource-schedule predecessors.
    pub fn with_resource_dependencies(mut self, include: bool) -> Self {
        self.include_resource_dependencies = include;
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Build the graph.
    ///
    /// Missing and circular dependencies are collected as soft errors. An
    /// acyclic graph that still breaks the start/end invariant is a fatal
    /// [`CompilerError::InvalidGraph`].
    pub fn build(self, activities: &[DependentActivity]) -> Result<DependencyGraph, CompilerError> {
        let verbosity = self.verbosity;
        let mut graph = VertexGraph::new(self.node_ids, self.edge_ids);

        let mut seen: FxHashSet<Id> = FxHashSet::default();
        for da in activities {
            if !seen.insert(da.id()) {
                return Err(CompilerError::DuplicateActivityId(da.id()));
            }
            graph.add_node(da.id(), ())?;
        }

        let mut errors = check_missing_dependencies(activities, self.include_resource_dependencies);
        for error in &errors {
            log_phase!(verbosity, "{}", error.message);
        }

        for da in activities {
            let deps = if self.include_resource_dependencies {
                da.all_dependencies()
            } else {
                da.dependencies.clone()
            };
            for dep in deps {
                if !graph.contains_node(dep) || graph.find_edge(dep, da.id()).is_some() {
                    continue;
                }
                let edge_id = graph.add_edge(dep, da.id(), ())?;
                log_debug!(verbosity, "edge {}: {} -> {}", edge_id, dep, da.id());
            }
        }

        let cycles = graph.cycles();
        for cycle in &cycles {
            let error = circular_dependency_error(cycle);
            log_phase!(verbosity, "{}", error.message);
            errors.push(error);
        }

        if cycles.is_empty() {
            graph.validate()?;
        }

        log_decision!(
            verbosity,
            "built graph with {} nodes, {} edges, {} cycles",
            graph.node_count(),
            graph.edge_count(),
            cycles.len()
        );

        Ok(DependencyGraph {
            graph,
            errors,
            cycles,
        })
    }
}
