//! Graph types: resource counters, edge keys, detection report.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::{ProcessId, ResourceId, KEY_DELIMITER};

/// Instance counters for one resource.
///
/// Invariant: `available <= total`, and `total - available` equals the sum of
/// all allocation edges pointing at the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCounts {
    pub total: u32,
    pub available: u32,
}

impl ResourceCounts {
    pub fn new(instances: u32) -> Self {
        Self {
            total: instances,
            available: instances,
        }
    }

    /// Instances currently held by processes.
    pub fn held(&self) -> u32 {
        self.total.saturating_sub(self.available)
    }
}

/// A `(process, resource)` pair keying allocation and request edges.
pub type EdgeKey = (ProcessId, ResourceId);

/// Encode an edge key as `"process|resource"` for the snapshot format.
pub fn encode_edge_key(process: &ProcessId, resource: &ResourceId) -> String {
    format!("{}{}{}", process, KEY_DELIMITER, resource)
}

/// Result of a deadlock detection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlockReport {
    /// True if at least one process could not finish.
    pub deadlocked: bool,

    /// Processes that are deadlocked or blocked behind a deadlock.
    pub blocked: BTreeSet<ProcessId>,

    /// Order in which the reduction finished processes. Informational only:
    /// the order is not part of the detection contract.
    pub completion_order: Vec<ProcessId>,

    /// Number of scan passes the reduction ran, including the final idle pass.
    pub passes: usize,
}

impl DeadlockReport {
    /// The `(deadlocked, blocked set)` pair.
    pub fn into_pair(self) -> (bool, BTreeSet<ProcessId>) {
        (self.deadlocked, self.blocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_counts_held() {
        let mut counts = ResourceCounts::new(3);
        assert_eq!(counts.held(), 0);
        counts.available = 1;
        assert_eq!(counts.held(), 2);
    }

    #[test]
    fn test_encode_edge_key() {
        let key = encode_edge_key(&ProcessId::must("P1"), &ResourceId::must("R2"));
        assert_eq!(key, "P1|R2");
    }
}
