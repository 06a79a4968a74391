//! Critical path scheduling over the dependency graph.
//!
//! A forward pass computes earliest times, a backward pass latest times, and
//! the two together give total and free slack. Activities with zero total
//! slack form the critical path.

mod calculation;
mod types;

pub use calculation::{apply_timings, calculate_critical_path};
pub use types::{ActivityTiming, CriticalPathResult};
