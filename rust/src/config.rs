//! Configuration for the compiler pipeline.

#[cfg(feature = "python")]
use pyo3::prelude::*;

use crate::models::ActivitySeverity;

/// Knobs for one compile request.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Debug, PartialEq)]
pub struct CompilerConfig {
    /// Verbosity level: 0=silent, 1=phases, 2=decisions, 3=debug.
    pub verbosity: u8,
    /// Measure complexity and draw diagrams on the transitively reduced graph.
    pub reduce_transitive_edges: bool,
    /// Slack thresholds in ascending order with their risk weights.
    pub severity_table: Vec<ActivitySeverity>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            reduce_transitive_edges: true,
            severity_table: default_severity_table(),
        }
    }
}

/// Severity table used when the caller supplies none.
pub fn default_severity_table() -> Vec<ActivitySeverity> {
    [(0, 4.0, 89.0), (9, 3.0, 55.0), (25, 2.0, 34.0), (i32::MAX, 1.0, 21.0)]
        .into_iter()
        .map(
            |(slack_limit, criticality_weight, fibonacci_weight)| ActivitySeverity {
                slack_limit,
                criticality_weight,
                fibonacci_weight,
            },
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.verbosity, 0);
        assert!(config.reduce_transitive_edges);
        assert_eq!(config.severity_table.len(), 4);
    }

    #[test]
    fn test_default_table_is_ascending() {
        let table = default_severity_table();
        assert!(table
            .windows(2)
            .all(|w| w[0].slack_limit < w[1].slack_limit));
        assert!((table[0].criticality_weight - 4.0).abs() < 1e-9);
    }
}
