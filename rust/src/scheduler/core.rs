//! Core resource allocator.

use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::CompilerError;
use crate::graph::validation::{is_allocatable, unsatisfied_target_error};
use crate::ids::Id;
use crate::models::{
    Activity, AllocationType, DependentActivity, GraphCompilationError, LogicalOperator, Resource,
    ResourceSchedule, ResourceSettings, ScheduledActivity,
};
use crate::{log_decision, log_debug, log_phase};

use super::timeline::ResourceTimeline;

/// Everything the allocator decided.
#[derive(Clone, Debug, Default)]
pub struct AllocationResult {
    /// One schedule per active resource, or a single pass-through schedule
    /// when resources are disabled.
    pub schedules: Vec<ResourceSchedule>,
    /// Activity id -> activities immediately before it on a shared resource.
    pub resource_dependencies: FxHashMap<Id, BTreeSet<Id>>,
    /// Activity id -> resources it was placed on.
    pub allocations: FxHashMap<Id, BTreeSet<Id>>,
    /// Activity id -> allocated (start, finish).
    pub placements: FxHashMap<Id, (i32, i32)>,
    pub errors: Vec<GraphCompilationError>,
    /// Largest allocated finish time.
    pub finish_time: i32,
}

/// Assigns activities to resource timelines.
///
/// Direct resources take one activity at a time. Activities are visited in
/// ascending earliest start, ties broken by ascending duration and then by
/// topological position, so every predecessor is placed before its
/// dependents.
pub struct ResourceAllocator<'a> {
    settings: &'a ResourceSettings,
    verbosity: u8,
}

impl<'a> ResourceAllocator<'a> {
    pub fn new(settings: &'a ResourceSettings, verbosity: u8) -> Self {
        Self {
            settings,
            verbosity,
        }
    }

    /// Allocate activities whose earliest times are already computed.
    ///
    /// # Arguments
    /// * `activities` - Activities with earliest start/finish populated
    /// * `topological_order` - Activity ids in dependency order, used for tie-breaks
    pub fn allocate(
        &self,
        activities: &[DependentActivity],
        topological_order: &[Id],
    ) -> Result<AllocationResult, CompilerError> {
        if self.settings.are_disabled {
            log_phase!(self.verbosity, "resources disabled, scheduling by duration only");
            return Ok(self.pass_through(activities));
        }

        let position: FxHashMap<Id, usize> = topological_order
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect();
        let mut order: Vec<&DependentActivity> = activities
            .iter()
            .filter(|da| da.activity.earliest_start_time.is_some())
            .collect();
        order.sort_by_key(|da| {
            (
                da.activity.earliest_start_time,
                da.activity.duration,
                position.get(&da.id()).copied().unwrap_or(usize::MAX),
                da.id(),
            )
        });

        let mut timelines: BTreeMap<Id, ResourceTimeline> = self
            .active_resources()
            .filter(|r| r.allocation_type == AllocationType::Direct)
            .map(|r| (r.id, ResourceTimeline::new(r.id)))
            .collect();
        let resources: FxHashMap<Id, &Resource> =
            self.settings.resources.iter().map(|r| (r.id, r)).collect();
        let mut pool: Vec<&Resource> = self
            .active_resources()
            .filter(|r| r.allocation_type == AllocationType::Direct && !r.is_explicit_target)
            .collect();
        pool.sort_by_key(|r| (r.allocation_order, r.id));

        let mut result = AllocationResult::default();
        let mut unsatisfied: Vec<Id> = Vec::new();

        for da in order {
            let activity = &da.activity;
            let mut ready = da
                .dependencies
                .iter()
                .filter_map(|dep| result.placements.get(dep).map(|(_, finish)| *finish))
                .max()
                .unwrap_or(0);
            if let Some(minimum) = activity.minimum_earliest_start_time {
                ready = ready.max(minimum);
            }

            if activity.is_dummy() {
                result.placements.insert(activity.id, (ready, ready));
                continue;
            }

            let chosen: Vec<Id> = if activity.target_resources.is_empty() {
                let candidates: Vec<Id> = pool.iter().map(|r| r.id).collect();
                self.pick_single(&timelines, &resources, &candidates, ready, activity.duration)
                    .into_iter()
                    .collect()
            } else {
                let mut eligible: Vec<Id> = activity
                    .target_resources
                    .iter()
                    .copied()
                    .filter(|id| is_allocatable(self.settings, *id))
                    .collect();
                eligible.sort_by_key(|id| {
                    resources
                        .get(id)
                        .map(|r| (r.allocation_order, r.id))
                        .unwrap_or((i32::MAX, *id))
                });
                if eligible.is_empty() {
                    log_phase!(
                        self.verbosity,
                        "activity {} has no active target resource",
                        activity.id
                    );
                    unsatisfied.push(activity.id);
                }
                match activity.target_resource_operator {
                    LogicalOperator::And => eligible,
                    LogicalOperator::Or => self
                        .pick_single(&timelines, &resources, &eligible, ready, activity.duration)
                        .into_iter()
                        .collect(),
                }
            };

            let start = common_start(&timelines, &chosen, ready, activity.duration);
            let finish = start + activity.duration;
            for resource_id in &chosen {
                if let Some(timeline) = timelines.get_mut(resource_id) {
                    timeline.place(ScheduledActivity {
                        id: activity.id,
                        name: activity.name.clone(),
                        duration: activity.duration,
                        start_time: start,
                        finish_time: finish,
                    });
                }
            }
            log_decision!(
                self.verbosity,
                "activity {} on {:?} from {} to {} (ready at {})",
                activity.id,
                chosen,
                start,
                finish,
                ready
            );
            result.placements.insert(activity.id, (start, finish));
            if !chosen.is_empty() {
                result
                    .allocations
                    .insert(activity.id, chosen.into_iter().collect());
            }
        }

        if !unsatisfied.is_empty() {
            unsatisfied.sort_unstable();
            result.errors.push(unsatisfied_target_error(&unsatisfied));
        }

        result.finish_time = result
            .placements
            .values()
            .map(|(_, finish)| *finish)
            .max()
            .unwrap_or(0);

        let lookup: FxHashMap<Id, &Activity> = activities
            .iter()
            .map(|da| (da.id(), &da.activity))
            .collect();
        result.schedules = self.build_schedules(
            &timelines,
            &lookup,
            result.finish_time,
            &mut result.resource_dependencies,
        )?;
        Ok(result)
    }

    fn active_resources(&self) -> impl Iterator<Item = &'a Resource> {
        let settings: &'a ResourceSettings = self.settings;
        settings.resources.iter().filter(|r| !r.is_inactive)
    }

    /// The candidate that can start earliest; ties go to the lowest allocation order.
    fn pick_single(
        &self,
        timelines: &BTreeMap<Id, ResourceTimeline>,
        resources: &FxHashMap<Id, &Resource>,
        candidates: &[Id],
        ready: i32,
        duration: i32,
    ) -> Option<Id> {
        candidates
            .iter()
            .filter_map(|id| {
                let timeline = timelines.get(id)?;
                let order = resources.get(id).map(|r| r.allocation_order).unwrap_or(i32::MAX);
                Some((timeline.next_available_time(ready, duration), order, *id))
            })
            .min()
            .map(|(start, _, id)| {
                log_debug!(self.verbosity, "resource {} free from {}", id, start);
                id
            })
    }

    /// Turn timelines into schedules and derive resource dependencies.
    fn build_schedules(
        &self,
        timelines: &BTreeMap<Id, ResourceTimeline>,
        lookup: &FxHashMap<Id, &Activity>,
        project_finish: i32,
        resource_dependencies: &mut FxHashMap<Id, BTreeSet<Id>>,
    ) -> Result<Vec<ResourceSchedule>, CompilerError> {
        let mut ordered: Vec<&Resource> = self.active_resources().collect();
        ordered.sort_by_key(|r| (r.display_order, r.id));

        let mut direct: Vec<ResourceSchedule> = Vec::new();
        for resource in &ordered {
            match resource.allocation_type {
                AllocationType::Indirect => {}
                AllocationType::Direct => {
                    let entries = timelines
                        .get(&resource.id)
                        .map(|t| t.sorted_entries())
                        .unwrap_or_default();
                    for pair in entries.windows(2) {
                        if pair[1].start_time < pair[0].finish_time {
                            return Err(CompilerError::OverlappingSchedule {
                                resource_id: resource.id,
                                first: pair[0].id,
                                second: pair[1].id,
                            });
                        }
                        resource_dependencies
                            .entry(pair[1].id)
                            .or_default()
                            .insert(pair[0].id);
                    }
                    direct.push(schedule_from_entries(
                        Some((*resource).clone()),
                        entries,
                        lookup,
                        project_finish,
                    ));
                }
            }
        }

        let mut schedules = Vec::with_capacity(ordered.len());
        let overhead = overhead_schedule(&direct, project_finish);
        for resource in ordered {
            match resource.allocation_type {
                AllocationType::Direct => {
                    if let Some(idx) = direct.iter().position(|s| s.resource_id() == Some(resource.id)) {
                        schedules.push(direct.swap_remove(idx));
                    }
                }
                AllocationType::Indirect => {
                    let mut schedule = overhead.clone();
                    schedule.resource = Some(resource.clone());
                    schedules.push(schedule);
                }
            }
        }
        Ok(schedules)
    }

    /// Everything at its earliest times on one resource-less schedule.
    fn pass_through(&self, activities: &[DependentActivity]) -> AllocationResult {
        let mut result = AllocationResult::default();
        let mut entries = Vec::new();
        for da in activities {
            let activity = &da.activity;
            let (Some(start), Some(finish)) =
                (activity.earliest_start_time, activity.earliest_finish_time)
            else {
                continue;
            };
            result.placements.insert(activity.id, (start, finish));
            if !activity.is_dummy() {
                entries.push(ScheduledActivity {
                    id: activity.id,
                    name: activity.name.clone(),
                    duration: activity.duration,
                    start_time: start,
                    finish_time: finish,
                });
            }
        }
        entries.sort_by_key(|e| (e.start_time, e.duration, e.id));
        result.finish_time = result
            .placements
            .values()
            .map(|(_, finish)| *finish)
            .max()
            .unwrap_or(0);

        let lookup: FxHashMap<Id, &Activity> = activities
            .iter()
            .map(|da| (da.id(), &da.activity))
            .collect();
        result.schedules = vec![schedule_from_entries(None, entries, &lookup, result.finish_time)];
        result
    }
}

/// Smallest start at or after `ready` that is idle on every listed timeline.
fn common_start(
    timelines: &BTreeMap<Id, ResourceTimeline>,
    resource_ids: &[Id],
    ready: i32,
    duration: i32,
) -> i32 {
    let mut start = ready;
    loop {
        let next = resource_ids
            .iter()
            .filter_map(|id| timelines.get(id))
            .map(|t| t.next_available_time(start, duration))
            .max()
            .unwrap_or(start);
        if next == start {
            return start;
        }
        start = next;
    }
}

fn schedule_from_entries(
    resource: Option<Resource>,
    entries: Vec<ScheduledActivity>,
    lookup: &FxHashMap<Id, &Activity>,
    project_finish: i32,
) -> ResourceSchedule {
    let len = project_finish.max(0) as usize;
    let mut activity_allocation = vec![false; len];
    let mut cost_allocation = vec![false; len];
    let mut billing_allocation = vec![false; len];
    let mut effort_allocation = vec![false; len];

    for entry in &entries {
        let activity = lookup.get(&entry.id);
        let has_cost = activity.map(|a| !a.has_no_cost).unwrap_or(true);
        let has_billing = activity.map(|a| !a.has_no_billing).unwrap_or(true);
        let has_effort = activity.map(|a| !a.has_no_effort).unwrap_or(true);
        for t in entry.start_time.max(0)..entry.finish_time.min(project_finish) {
            let t = t as usize;
            activity_allocation[t] = true;
            cost_allocation[t] |= has_cost;
            billing_allocation[t] |= has_billing;
            effort_allocation[t] |= has_effort;
        }
    }

    ResourceSchedule {
        resource,
        finish_time: entries.iter().map(|e| e.finish_time).max().unwrap_or(0),
        scheduled_activities: entries,
        activity_allocation,
        cost_allocation,
        billing_allocation,
        effort_allocation,
    }
}

/// Busy whenever any direct resource is busy, with no activity entries.
fn overhead_schedule(direct: &[ResourceSchedule], project_finish: i32) -> ResourceSchedule {
    let len = project_finish.max(0) as usize;
    let mut schedule = ResourceSchedule {
        activity_allocation: vec![false; len],
        cost_allocation: vec![false; len],
        billing_allocation: vec![false; len],
        effort_allocation: vec![false; len],
        ..Default::default()
    };
    for source in direct {
        for t in 0..len {
            schedule.activity_allocation[t] |= source.activity_allocation[t];
            schedule.cost_allocation[t] |= source.cost_allocation[t];
            schedule.billing_allocation[t] |= source.billing_allocation[t];
            schedule.effort_allocation[t] |= source.effort_allocation[t];
        }
    }
    // no entries, so no finish time; the busy span lives in the bits
    schedule
}
