//! Slack-to-weight lookup over an ordered threshold table.

use crate::models::ActivitySeverity;

/// Weight used for activities whose slack is unknown or beyond every threshold.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Ordered severity table.
#[derive(Clone, Debug)]
pub struct SeverityLookup {
    entries: Vec<ActivitySeverity>,
}

impl SeverityLookup {
    /// Build a lookup; entries are sorted by ascending slack limit.
    pub fn new(mut entries: Vec<ActivitySeverity>) -> Self {
        entries.sort_by_key(|e| e.slack_limit);
        Self { entries }
    }

    /// First entry whose slack limit is at least `slack`.
    pub fn find(&self, slack: i32) -> Option<&ActivitySeverity> {
        let idx = self.entries.partition_point(|e| e.slack_limit < slack);
        self.entries.get(idx)
    }

    pub fn criticality_weight(&self, slack: Option<i32>) -> f64 {
        slack
            .and_then(|s| self.find(s))
            .map(|e| e.criticality_weight)
            .unwrap_or(DEFAULT_WEIGHT)
    }

    pub fn fibonacci_weight(&self, slack: Option<i32>) -> f64 {
        slack
            .and_then(|s| self.find(s))
            .map(|e| e.fibonacci_weight)
            .unwrap_or(DEFAULT_WEIGHT)
    }

    /// Criticality weight of the lowest-slack entry.
    pub fn fully_critical_weight(&self) -> f64 {
        self.entries
            .first()
            .map(|e| e.criticality_weight)
            .unwrap_or(DEFAULT_WEIGHT)
    }

    /// Fibonacci weight of the lowest-slack entry.
    pub fn fully_critical_fibonacci_weight(&self) -> f64 {
        self.entries
            .first()
            .map(|e| e.fibonacci_weight)
            .unwrap_or(DEFAULT_WEIGHT)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
