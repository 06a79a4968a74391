//! Busy-period tracking for a single resource.

use crate::ids::Id;
use crate::models::ScheduledActivity;

/// Tracks busy periods for a resource as sorted, non-overlapping half-open
/// intervals `[start, finish)` in whole time units.
///
/// Adjacent periods are merged, so each gap between periods is a real idle
/// window. Binary search keeps lookups O(log n).
#[derive(Clone, Debug)]
pub struct ResourceTimeline {
    pub resource_id: Id,
    /// Invariant: sorted by start, non-overlapping, non-adjacent.
    pub busy_periods: Vec<(i32, i32)>,
    /// Activities placed on this timeline, in placement order.
    pub entries: Vec<ScheduledActivity>,
}

impl ResourceTimeline {
    pub fn new(resource_id: Id) -> Self {
        Self {
            resource_id,
            busy_periods: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Mark `[start, finish)` busy, merging with overlapping or adjacent periods.
    pub fn add_busy_period(&mut self, start: i32, finish: i32) {
        if finish <= start {
            return;
        }

        let idx = self.busy_periods.partition_point(|(s, _)| *s < start);

        let mut new_start = start;
        let mut new_finish = finish;
        let mut merge_start = idx;
        let mut merge_end = idx;

        if idx > 0 {
            let (prev_start, prev_finish) = self.busy_periods[idx - 1];
            if prev_finish >= start {
                new_start = prev_start;
                new_finish = new_finish.max(prev_finish);
                merge_start = idx - 1;
            }
        }

        while merge_end < self.busy_periods.len() {
            let (next_start, next_finish) = self.busy_periods[merge_end];
            if next_start <= new_finish {
                new_finish = new_finish.max(next_finish);
                merge_end += 1;
            } else {
                break;
            }
        }

        if merge_start < merge_end {
            self.busy_periods.drain(merge_start..merge_end);
        }
        self.busy_periods.insert(merge_start, (new_start, new_finish));
    }

    /// Earliest time at or after `from` when `[t, t + duration)` is idle.
    pub fn next_available_time(&self, from: i32, duration: i32) -> i32 {
        let mut candidate = from;
        if duration <= 0 {
            return candidate;
        }
        // First period that ends after the candidate
        let mut idx = self.busy_periods.partition_point(|(_, f)| *f <= candidate);
        while let Some(&(busy_start, busy_finish)) = self.busy_periods.get(idx) {
            if candidate + duration <= busy_start {
                return candidate;
            }
            candidate = candidate.max(busy_finish);
            idx += 1;
        }
        candidate
    }

    /// Whether `[start, start + duration)` is idle.
    pub fn is_available(&self, start: i32, duration: i32) -> bool {
        self.next_available_time(start, duration) == start
    }

    /// Place an activity; the caller has checked availability.
    pub fn place(&mut self, entry: ScheduledActivity) {
        self.add_busy_period(entry.start_time, entry.finish_time);
        self.entries.push(entry);
    }

    /// Entries ordered by start time, ties by finish then id.
    pub fn sorted_entries(&self) -> Vec<ScheduledActivity> {
        let mut entries = self.entries.clone();
        entries.sort_by_key(|e| (e.start_time, e.finish_time, e.id));
        entries
    }

    /// End of the last busy period, or 0 when idle throughout.
    pub fn finish_time(&self) -> i32 {
        self.busy_periods.last().map(|(_, f)| *f).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline(periods: &[(i32, i32)]) -> ResourceTimeline {
        let mut t = ResourceTimeline::new(1);
        for &(s, f) in periods {
            t.add_busy_period(s, f);
        }
        t
    }

    #[test]
    fn test_empty_timeline() {
        let t = ResourceTimeline::new(1);
        assert_eq!(t.next_available_time(3, 5), 3);
        assert_eq!(t.finish_time(), 0);
    }

    #[test]
    fn test_next_available_before_busy() {
        let t = timeline(&[(10, 15)]);
        assert_eq!(t.next_available_time(0, 5), 0);
        assert_eq!(t.next_available_time(6, 5), 15);
    }

    #[test]
    fn test_next_available_during_busy() {
        let t = timeline(&[(10, 15)]);
        assert_eq!(t.next_available_time(12, 1), 15);
    }

    #[test]
    fn test_fits_gap() {
        let t = timeline(&[(0, 4), (7, 10)]);
        assert_eq!(t.next_available_time(0, 3), 4);
        assert_eq!(t.next_available_time(0, 4), 10);
    }

    #[test]
    fn test_add_adjacent_merges() {
        let t = timeline(&[(10, 15), (15, 20)]);
        assert_eq!(t.busy_periods, vec![(10, 20)]);
    }

    #[test]
    fn test_add_overlapping_merges() {
        let t = timeline(&[(10, 15), (12, 20), (1, 3)]);
        assert_eq!(t.busy_periods, vec![(1, 3), (10, 20)]);
    }

    #[test]
    fn test_add_bridging_merges_both_sides() {
        let t = timeline(&[(0, 2), (5, 8), (2, 5)]);
        assert_eq!(t.busy_periods, vec![(0, 8)]);
    }

    #[test]
    fn test_zero_length_period_ignored() {
        let t = timeline(&[(3, 3)]);
        assert!(t.busy_periods.is_empty());
    }

    #[test]
    fn test_is_available() {
        let t = timeline(&[(10, 15)]);
        assert!(t.is_available(0, 10));
        assert!(!t.is_available(5, 6));
        assert!(t.is_available(15, 5));
    }
}
