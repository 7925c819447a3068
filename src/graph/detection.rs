//! Deadlock detection by graph reduction.
//!
//! Multi-instance generalisation of wait-for cycle detection. Starting from
//! the currently available instances, repeatedly pick any unfinished process
//! whose whole outstanding request fits in the work vector, pretend it runs
//! to completion, and return its holdings to the work vector. Processes that
//! never become finishable are deadlocked or blocked behind a deadlock.
//!
//! `work` only ever grows, so the finishable set is a fixpoint that does not
//! depend on scan order; the order processes finish in does.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::types::DeadlockReport;
use super::ResourceAllocationGraph;
use crate::types::{ProcessId, ResourceId};

impl ResourceAllocationGraph {
    /// Run the reduction and report which processes can never finish.
    pub fn detect_deadlock(&self) -> DeadlockReport {
        let mut work: HashMap<&ResourceId, u64> = self
            .resources
            .iter()
            .map(|(r, counts)| (r, u64::from(counts.available)))
            .collect();

        let mut held: HashMap<&ProcessId, Vec<(&ResourceId, u64)>> = HashMap::new();
        for ((p, r), &count) in &self.allocations {
            held.entry(p).or_default().push((r, u64::from(count)));
        }

        let mut wanted: HashMap<&ProcessId, Vec<(&ResourceId, u64)>> = HashMap::new();
        for ((p, r), &count) in &self.requests {
            if count > 0 {
                wanted.entry(p).or_default().push((r, u64::from(count)));
            }
        }

        let mut finished: HashSet<&ProcessId> = HashSet::with_capacity(self.processes.len());
        let mut completion_order = Vec::with_capacity(self.processes.len());
        let mut passes = 0;

        loop {
            passes += 1;
            let mut progressed = false;

            for p in &self.processes {
                if finished.contains(p) {
                    continue;
                }

                let satisfiable = wanted.get(p).map_or(true, |reqs| {
                    reqs.iter()
                        .all(|(r, need)| *need <= work.get(r).copied().unwrap_or(0))
                });
                if !satisfiable {
                    continue;
                }

                if let Some(holdings) = held.get(p) {
                    for (r, count) in holdings {
                        *work.entry(*r).or_insert(0) += count;
                    }
                }
                finished.insert(p);
                completion_order.push(p.clone());
                progressed = true;
            }

            if !progressed {
                break;
            }
        }

        let blocked: BTreeSet<ProcessId> = self
            .processes
            .iter()
            .filter(|p| !finished.contains(p))
            .cloned()
            .collect();
        let deadlocked = !blocked.is_empty();

        if deadlocked {
            tracing::info!(blocked = blocked.len(), passes, "deadlock detected");
        } else {
            tracing::debug!(processes = self.processes.len(), passes, "no deadlock");
        }

        DeadlockReport {
            deadlocked,
            blocked,
            completion_order,
            passes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(s: &str) -> ProcessId {
        ProcessId::must(s)
    }

    fn rid(s: &str) -> ResourceId {
        ResourceId::must(s)
    }

    fn set(ids: &[&str]) -> BTreeSet<ProcessId> {
        ids.iter().map(|s| pid(s)).collect()
    }

    #[test]
    fn test_empty_graph() {
        let g = ResourceAllocationGraph::new();
        let report = g.detect_deadlock();
        assert!(!report.deadlocked);
        assert!(report.blocked.is_empty());
        assert_eq!(report.passes, 1);
    }

    #[test]
    fn test_holder_without_request_unblocks_waiter() {
        let mut g = ResourceAllocationGraph::new();
        let p1 = g.register_process(None).unwrap();
        let p2 = g.register_process(None).unwrap();
        let r1 = g.register_resource(None, Some(1)).unwrap();
        g.allocate(&p1, &r1, 1).unwrap();
        g.request(&p2, &r1, 1).unwrap();

        let (deadlocked, blocked) = g.detect_deadlock().into_pair();
        assert!(!deadlocked);
        assert!(blocked.is_empty());
    }

    #[test]
    fn test_circular_wait() {
        let mut g = ResourceAllocationGraph::new();
        let p1 = g.register_process(None).unwrap();
        let p2 = g.register_process(None).unwrap();
        let r1 = g.register_resource(None, Some(1)).unwrap();
        let r2 = g.register_resource(None, Some(1)).unwrap();
        g.allocate(&p1, &r1, 1).unwrap();
        g.allocate(&p2, &r2, 1).unwrap();
        g.request(&p1, &r2, 1).unwrap();
        g.request(&p2, &r1, 1).unwrap();

        let report = g.detect_deadlock();
        assert!(report.deadlocked);
        assert_eq!(report.blocked, set(&["P1", "P2"]));
        assert!(report.completion_order.is_empty());
    }

    #[test]
    fn test_bystander_blocked_behind_cycle() {
        let mut g = ResourceAllocationGraph::new();
        for label in ["A", "B", "C", "D"] {
            g.register_process(Some(label)).unwrap();
        }
        g.register_resource(Some("X"), Some(1)).unwrap();
        g.register_resource(Some("Y"), Some(1)).unwrap();
        g.register_resource(Some("Z"), Some(1)).unwrap();

        g.allocate(&pid("A"), &rid("X"), 1).unwrap();
        g.allocate(&pid("B"), &rid("Y"), 1).unwrap();
        g.request(&pid("A"), &rid("Y"), 1).unwrap();
        g.request(&pid("B"), &rid("X"), 1).unwrap();
        // C waits on the cycle, D is free to run.
        g.request(&pid("C"), &rid("X"), 1).unwrap();
        g.allocate(&pid("D"), &rid("Z"), 1).unwrap();

        let report = g.detect_deadlock();
        assert_eq!(report.blocked, set(&["A", "B", "C"]));
        assert_eq!(report.completion_order, vec![pid("D")]);
    }

    #[test]
    fn test_multi_instance_no_deadlock() {
        // Classic textbook case: a cycle exists in the graph but a spare
        // instance lets the reduction complete.
        let mut g = ResourceAllocationGraph::new();
        for label in ["P1", "P2", "P3", "P4"] {
            g.register_process(Some(label)).unwrap();
        }
        g.register_resource(Some("R1"), Some(2)).unwrap();
        g.register_resource(Some("R2"), Some(2)).unwrap();

        g.allocate(&pid("P1"), &rid("R2"), 1).unwrap();
        g.request(&pid("P1"), &rid("R1"), 1).unwrap();
        g.allocate(&pid("P2"), &rid("R1"), 1).unwrap();
        g.allocate(&pid("P3"), &rid("R1"), 1).unwrap();
        g.request(&pid("P3"), &rid("R2"), 1).unwrap();
        g.allocate(&pid("P4"), &rid("R2"), 1).unwrap();

        let report = g.detect_deadlock();
        assert!(!report.deadlocked);
        assert_eq!(report.completion_order.len(), 4);
    }

    #[test]
    fn test_request_beyond_total_never_finishes() {
        let mut g = ResourceAllocationGraph::new();
        let p = g.register_process(None).unwrap();
        let r = g.register_resource(None, Some(2)).unwrap();
        g.request(&p, &r, 3).unwrap();

        let report = g.detect_deadlock();
        assert!(report.deadlocked);
        assert_eq!(report.blocked, set(&["P1"]));
    }

    #[test]
    fn test_chain_needs_multiple_passes() {
        // P1 needs what P2 holds, P2 needs what P3 holds. Sorted scan order
        // finishes P3, then P2, then P1, one per pass.
        let mut g = ResourceAllocationGraph::new();
        let p1 = g.register_process(None).unwrap();
        let p2 = g.register_process(None).unwrap();
        let p3 = g.register_process(None).unwrap();
        let ra = g.register_resource(None, Some(1)).unwrap();
        let rb = g.register_resource(None, Some(1)).unwrap();
        g.allocate(&p2, &ra, 1).unwrap();
        g.allocate(&p3, &rb, 1).unwrap();
        g.request(&p1, &ra, 1).unwrap();
        g.request(&p2, &rb, 1).unwrap();

        let report = g.detect_deadlock();
        assert!(!report.deadlocked);
        assert_eq!(report.completion_order, vec![p3, p2, p1]);
        assert_eq!(report.passes, 4);
    }

    #[test]
    fn test_detection_does_not_mutate() {
        let mut g = ResourceAllocationGraph::new();
        let p = g.register_process(None).unwrap();
        let r = g.register_resource(None, Some(2)).unwrap();
        g.allocate(&p, &r, 1).unwrap();

        let before = g.snapshot();
        let _ = g.detect_deadlock();
        assert_eq!(g.snapshot(), before);
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_deadlock_is_logged() {
        let mut g = ResourceAllocationGraph::new();
        let p = g.register_process(None).unwrap();
        let r = g.register_resource(None, Some(0)).unwrap();
        g.request(&p, &r, 1).unwrap();

        assert!(g.detect_deadlock().deadlocked);
        assert!(logs_contain("deadlock detected"));
    }
}
