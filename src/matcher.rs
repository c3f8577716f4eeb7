//! Container matching.
//!
//! The matcher applies the group half of placement policy and nothing else.
//! The orchestrator independently excludes containers already hosting a
//! module and applies the target-count policy; keeping those concerns out of
//! the matcher means a matcher result is always safe to intersect with any
//! count or dedup rule the caller enforces.

use crate::cluster::Container;
use crate::stream::ModuleDescriptor;

/// Filter candidates down to those eligible to host the given module.
///
/// A module without a group constraint matches every candidate. Candidate
/// order is preserved, so "first eligible" picks are deterministic for a
/// given candidate ordering.
pub fn matching_containers<'a>(descriptor: &ModuleDescriptor, candidates: &'a [Container]) -> Vec<&'a Container> {
    candidates
        .iter()
        .filter(|container| !descriptor.has_group() || container.groups().contains(&descriptor.group))
        .collect()
}
