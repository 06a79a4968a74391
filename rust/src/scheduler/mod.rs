//! Resource allocation.
//!
//! Activities are placed on resource timelines after the first critical
//! path pass. The allocator reports which resources each activity landed on
//! and the extra ordering that sharing a resource implies.

mod core;
mod timeline;

pub use core::{AllocationResult, ResourceAllocator};
pub use timeline::ResourceTimeline;
