//! Fatal errors raised by the compiler.
//!
//! Soft, user-facing problems (missing or circular dependencies, unsatisfiable
//! resource targets) are not errors in this sense: they are collected into
//! [`crate::models::CompilationResult::compilation_errors`].

use thiserror::Error;

/// Errors that abort a compilation or a helper operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompilerError {
    #[error("Duplicate activity id: {0}")]
    DuplicateActivityId(i32),
    #[error("Duplicate resource id: {0}")]
    DuplicateResourceId(i32),
    #[error("Activity {activity_id} has negative duration {duration}")]
    NegativeDuration { activity_id: i32, duration: i32 },
    #[error("Activity {activity_id} targets unknown resource {resource_id}")]
    UnknownTargetResource { activity_id: i32, resource_id: i32 },
    #[error("Every resource is already an explicit target; no scenarios can be generated")]
    NoNonExplicitResources,
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),
    #[error("Graph references unknown node {0}")]
    UnknownNode(i32),
    #[error("Graph references unknown edge {0}")]
    UnknownEdge(i32),
    #[error("Resource {resource_id} schedule has overlapping entries {first} and {second}")]
    OverlappingSchedule {
        resource_id: i32,
        first: i32,
        second: i32,
    },
}
