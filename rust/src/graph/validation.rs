//! Input validation and soft structural checks.

use rustc_hash::FxHashSet;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::CompilerError;
use crate::ids::Id;
use crate::models::{
    AllocationType, DependentActivity, GraphCompilationError, GraphCompilationErrorCode,
    ResourceSettings,
};

fn join_ids<'a, I: IntoIterator<Item = &'a Id>>(ids: I) -> String {
    ids.into_iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Reject input that cannot be compiled at all.
pub fn validate_input(
    activities: &[DependentActivity],
    settings: &ResourceSettings,
) -> Result<(), CompilerError> {
    let mut resource_ids: FxHashSet<Id> = FxHashSet::default();
    for resource in &settings.resources {
        if !resource_ids.insert(resource.id) {
            return Err(CompilerError::DuplicateResourceId(resource.id));
        }
    }

    let mut activity_ids: FxHashSet<Id> = FxHashSet::default();
    for da in activities {
        let activity = &da.activity;
        if !activity_ids.insert(activity.id) {
            return Err(CompilerError::DuplicateActivityId(activity.id));
        }
        if activity.duration < 0 {
            return Err(CompilerError::NegativeDuration {
                activity_id: activity.id,
                duration: activity.duration,
            });
        }
        if let Some(&resource_id) = activity
            .target_resources
            .iter()
            .find(|r| !resource_ids.contains(r))
        {
            return Err(CompilerError::UnknownTargetResource {
                activity_id: activity.id,
                resource_id,
            });
        }
    }
    Ok(())
}

pub fn missing_dependency_error(missing_id: Id, referenced_by: &BTreeSet<Id>) -> GraphCompilationError {
    GraphCompilationError::new(
        GraphCompilationErrorCode::MissingDependency,
        format!(
            "Missing dependency {} referenced by activities {}",
            missing_id,
            join_ids(referenced_by)
        ),
        referenced_by.iter().copied().collect(),
    )
}

/// Report one missing-dependency error per unknown predecessor id.
pub fn check_missing_dependencies(
    activities: &[DependentActivity],
    include_resource_dependencies: bool,
) -> Vec<GraphCompilationError> {
    let known: FxHashSet<Id> = activities.iter().map(|da| da.id()).collect();
    let mut missing: BTreeMap<Id, BTreeSet<Id>> = BTreeMap::new();
    for da in activities {
        let deps = if include_resource_dependencies {
            da.all_dependencies()
        } else {
            da.dependencies.clone()
        };
        for dep in deps {
            if !known.contains(&dep) {
                missing.entry(dep).or_default().insert(da.id());
            }
        }
    }
    missing
        .iter()
        .map(|(id, referenced_by)| missing_dependency_error(*id, referenced_by))
        .collect()
}

pub fn circular_dependency_error(cycle: &[Id]) -> GraphCompilationError {
    let mut path = join_ids(cycle).replace(", ", " -> ");
    if let Some(first) = cycle.first() {
        path.push_str(&format!(" -> {}", first));
    }
    GraphCompilationError::new(
        GraphCompilationErrorCode::CircularDependency,
        format!("Circular dependency: {}", path),
        cycle.to_vec(),
    )
}

/// Flag plans whose resources can never be satisfied: every active resource
/// is an explicit target, yet some real activity names no target.
pub fn check_resource_targets(
    activities: &[DependentActivity],
    settings: &ResourceSettings,
) -> Option<GraphCompilationError> {
    if settings.are_disabled {
        return None;
    }
    let mut active = settings.resources.iter().filter(|r| !r.is_inactive).peekable();
    active.peek()?;
    if !active.all(|r| r.is_explicit_target) {
        return None;
    }
    let untargeted: Vec<Id> = activities
        .iter()
        .filter(|da| !da.activity.is_dummy() && da.activity.target_resources.is_empty())
        .map(|da| da.id())
        .collect();
    if untargeted.is_empty() {
        return None;
    }
    Some(GraphCompilationError::new(
        GraphCompilationErrorCode::InvalidResourceTargets,
        format!(
            "All resources are explicit targets but activities {} target none",
            join_ids(&untargeted)
        ),
        untargeted,
    ))
}

/// Activities whose target set has no active direct resource.
pub fn unsatisfied_target_error(activity_ids: &[Id]) -> GraphCompilationError {
    GraphCompilationError::new(
        GraphCompilationErrorCode::UnsatisfiedResourceTarget,
        format!(
            "No active resource can satisfy the targets of activities {}",
            join_ids(activity_ids)
        ),
        activity_ids.to_vec(),
    )
}

/// Activities that cannot finish by their latest-finish limit.
///
/// Run after a forward pass: the computed earliest finish already carries
/// predecessor delays. Activities the pass never reached fall back to their
/// own minimum start plus duration.
pub fn check_constraints(activities: &[DependentActivity]) -> Option<GraphCompilationError> {
    let invalid: Vec<Id> = activities
        .iter()
        .map(|da| &da.activity)
        .filter(|a| match a.maximum_latest_finish_time {
            Some(max_finish) => {
                let earliest_finish = a.earliest_finish_time.unwrap_or_else(|| {
                    a.minimum_earliest_start_time.unwrap_or(0).max(0) + a.duration
                });
                max_finish < earliest_finish
            }
            None => false,
        })
        .map(|a| a.id)
        .collect();
    if invalid.is_empty() {
        return None;
    }
    Some(GraphCompilationError::new(
        GraphCompilationErrorCode::InvalidConstraint,
        format!(
            "Latest finish constraints cannot be met by activities {}",
            join_ids(&invalid)
        ),
        invalid,
    ))
}

/// Whether a resource can be bound to an activity at all.
pub fn is_allocatable(settings: &ResourceSettings, resource_id: Id) -> bool {
    settings
        .resources
        .iter()
        .any(|r| r.id == resource_id && !r.is_inactive && r.allocation_type == AllocationType::Direct)
}
