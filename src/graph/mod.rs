//! Resource allocation graph engine.
//!
//! The engine owns all graph state: the process set, the resource pool with
//! instance counters, and the allocation and request edges between them.
//! It is a plain struct mutated through `&mut self`; hosts that share it
//! across tasks wrap it in one exclusive lock (see `ipc::server`).
//!
//! Invariant maintained by every operation:
//! ```text
//! available(r) + Σ allocation(p, r) == total(r)    for every resource r
//! ```
//! Operations either apply their whole effect or return an error without
//! touching state.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::types::{EngineConfig, Error, ProcessId, ResourceId, Result};
use crate::validation::validate_positive;

mod detection;
mod export;
mod import;
pub mod types;

pub use export::Snapshot;
pub use types::{encode_edge_key, DeadlockReport, EdgeKey, ResourceCounts};

/// Resource allocation graph.
#[derive(Debug, Clone)]
pub struct ResourceAllocationGraph {
    config: EngineConfig,
    pub(crate) processes: BTreeSet<ProcessId>,
    pub(crate) resources: BTreeMap<ResourceId, ResourceCounts>,
    pub(crate) allocations: HashMap<EdgeKey, u32>,
    pub(crate) requests: HashMap<EdgeKey, u32>,
    next_process_id: u64,
    next_resource_id: u64,
}

impl ResourceAllocationGraph {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            processes: BTreeSet::new(),
            resources: BTreeMap::new(),
            allocations: HashMap::new(),
            requests: HashMap::new(),
            next_process_id: 1,
            next_resource_id: 1,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a process. `None` (or an empty label) picks the next free
    /// auto-generated name.
    pub fn register_process(&mut self, id: Option<&str>) -> Result<ProcessId> {
        let pid = match id.filter(|s| !s.is_empty()) {
            Some(label) => crate::validation::parse_process_id(label)?,
            None => self.next_process_name()?,
        };

        if self.processes.contains(&pid) {
            return Err(Error::duplicate_entity(format!(
                "process {} already exists",
                pid
            )));
        }

        self.processes.insert(pid.clone());
        tracing::debug!(process = %pid, "registered process");
        Ok(pid)
    }

    /// Register a resource with `instances` units (engine default if `None`).
    pub fn register_resource(
        &mut self,
        id: Option<&str>,
        instances: Option<u32>,
    ) -> Result<ResourceId> {
        let rid = match id.filter(|s| !s.is_empty()) {
            Some(label) => crate::validation::parse_resource_id(label)?,
            None => self.next_resource_name()?,
        };

        if self.resources.contains_key(&rid) {
            return Err(Error::duplicate_entity(format!(
                "resource {} already exists",
                rid
            )));
        }

        let instances = instances.unwrap_or(self.config.default_instances);
        self.resources
            .insert(rid.clone(), ResourceCounts::new(instances));
        tracing::debug!(resource = %rid, instances, "registered resource");
        Ok(rid)
    }

    /// Smallest unused `P<N>` at or above the counter. The counter moves past
    /// every name it hands out, so names are not reused within a session.
    fn next_process_name(&mut self) -> Result<ProcessId> {
        loop {
            let candidate = format!("{}{}", self.config.process_prefix, self.next_process_id);
            self.next_process_id += 1;
            let pid = crate::validation::parse_process_id(&candidate)?;
            if !self.processes.contains(&pid) {
                return Ok(pid);
            }
        }
    }

    fn next_resource_name(&mut self) -> Result<ResourceId> {
        loop {
            let candidate = format!("{}{}", self.config.resource_prefix, self.next_resource_id);
            self.next_resource_id += 1;
            let rid = crate::validation::parse_resource_id(&candidate)?;
            if !self.resources.contains_key(&rid) {
                return Ok(rid);
            }
        }
    }

    // =========================================================================
    // Edge mutations
    // =========================================================================

    /// Add `count` to the outstanding request of `process` for `resource`.
    ///
    /// Requests are not bounded by the resource total: a process may wait for
    /// more than physically exists.
    pub fn request(&mut self, process: &ProcessId, resource: &ResourceId, count: u32) -> Result<()> {
        validate_positive(count, "request count")?;
        self.ensure_endpoints(process, resource)?;

        let key = (process.clone(), resource.clone());
        let current = self.requests.get(&key).copied().unwrap_or(0);
        let updated = current.checked_add(count).ok_or_else(|| {
            Error::invalid_argument(format!(
                "request count for ({}, {}) overflows",
                process, resource
            ))
        })?;
        self.requests.insert(key, updated);

        tracing::debug!(process = %process, resource = %resource, count, pending = updated, "request recorded");
        Ok(())
    }

    /// Hand `count` instances of `resource` to `process`.
    ///
    /// Outstanding requests are left untouched; request bookkeeping belongs
    /// to the caller.
    pub fn allocate(&mut self, process: &ProcessId, resource: &ResourceId, count: u32) -> Result<()> {
        validate_positive(count, "allocation count")?;
        self.ensure_endpoints(process, resource)?;

        let counts = self
            .resources
            .get_mut(resource)
            .ok_or_else(|| Error::unknown_entity(format!("resource {} does not exist", resource)))?;
        if count > counts.available {
            return Err(Error::insufficient_resource(format!(
                "not enough instances available ({}) in {} for {}",
                counts.available, resource, count
            )));
        }

        counts.available -= count;
        *self
            .allocations
            .entry((process.clone(), resource.clone()))
            .or_insert(0) += count;

        tracing::debug!(process = %process, resource = %resource, count, available = counts.available, "allocated");
        Ok(())
    }

    /// Return up to `count` instances held by `process` to the pool.
    ///
    /// Releasing a pair with no allocation edge is a silent no-op. Releasing
    /// more than is held returns only what is held and removes the edge.
    /// Returns the number of instances actually released.
    pub fn release(&mut self, process: &ProcessId, resource: &ResourceId, count: u32) -> Result<u32> {
        validate_positive(count, "release count")?;

        let key = (process.clone(), resource.clone());
        let held = match self.allocations.get(&key) {
            Some(&held) => held,
            None => return Ok(0),
        };

        let released = count.min(held);
        if released == held {
            self.allocations.remove(&key);
        } else {
            self.allocations.insert(key, held - released);
        }
        if let Some(counts) = self.resources.get_mut(resource) {
            counts.available += released;
        }

        tracing::debug!(process = %process, resource = %resource, requested = count, released, "released");
        Ok(released)
    }

    /// Withdraw up to `count` from the outstanding request of `process` for
    /// `resource`. Same no-op and clamping rules as [`Self::release`].
    pub fn cancel_request(&mut self, process: &ProcessId, resource: &ResourceId, count: u32) -> Result<u32> {
        validate_positive(count, "cancel count")?;

        let key = (process.clone(), resource.clone());
        let pending = match self.requests.get(&key) {
            Some(&pending) => pending,
            None => return Ok(0),
        };

        let withdrawn = count.min(pending);
        if withdrawn == pending {
            self.requests.remove(&key);
        } else {
            self.requests.insert(key, pending - withdrawn);
        }

        tracing::debug!(process = %process, resource = %resource, withdrawn, "request withdrawn");
        Ok(withdrawn)
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Remove a process. Instances it holds go back to their resources and its
    /// requests are dropped.
    pub fn remove_process(&mut self, process: &ProcessId) -> Result<()> {
        if !self.processes.remove(process) {
            return Err(Error::unknown_entity(format!(
                "process {} does not exist",
                process
            )));
        }

        let resources = &mut self.resources;
        self.allocations.retain(|(p, r), held| {
            if p != process {
                return true;
            }
            if let Some(counts) = resources.get_mut(r) {
                counts.available += *held;
            }
            false
        });
        self.requests.retain(|(p, _), _| p != process);

        tracing::debug!(process = %process, "removed process");
        Ok(())
    }

    /// Remove a resource and every edge that references it.
    pub fn remove_resource(&mut self, resource: &ResourceId) -> Result<()> {
        if self.resources.remove(resource).is_none() {
            return Err(Error::unknown_entity(format!(
                "resource {} does not exist",
                resource
            )));
        }

        self.allocations.retain(|(_, r), _| r != resource);
        self.requests.retain(|(_, r), _| r != resource);

        tracing::debug!(resource = %resource, "removed resource");
        Ok(())
    }

    /// Drop all state and rewind the auto-naming counters.
    pub fn reset(&mut self) {
        self.processes.clear();
        self.resources.clear();
        self.allocations.clear();
        self.requests.clear();
        self.next_process_id = 1;
        self.next_resource_id = 1;
        tracing::debug!("graph reset");
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn processes(&self) -> impl Iterator<Item = &ProcessId> {
        self.processes.iter()
    }

    pub fn resources(&self) -> impl Iterator<Item = (&ResourceId, &ResourceCounts)> {
        self.resources.iter()
    }

    pub fn contains_process(&self, process: &ProcessId) -> bool {
        self.processes.contains(process)
    }

    pub fn resource(&self, resource: &ResourceId) -> Option<&ResourceCounts> {
        self.resources.get(resource)
    }

    /// Instances of `resource` held by `process` (0 if no edge).
    pub fn allocation(&self, process: &ProcessId, resource: &ResourceId) -> u32 {
        self.allocations
            .get(&(process.clone(), resource.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Instances of `resource` `process` is waiting for (0 if no edge).
    pub fn request_count(&self, process: &ProcessId, resource: &ResourceId) -> u32 {
        self.requests
            .get(&(process.clone(), resource.clone()))
            .copied()
            .unwrap_or(0)
    }

    pub fn allocations(&self) -> impl Iterator<Item = (&EdgeKey, &u32)> {
        self.allocations.iter()
    }

    pub fn requests(&self) -> impl Iterator<Item = (&EdgeKey, &u32)> {
        self.requests.iter()
    }

    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Verify the counting and edge-endpoint invariants.
    ///
    /// Returns `MalformedState` describing the first violation found.
    pub fn check_invariants(&self) -> Result<()> {
        let mut held: HashMap<&ResourceId, u64> = HashMap::new();

        for ((p, r), &count) in &self.allocations {
            if !self.processes.contains(p) || !self.resources.contains_key(r) {
                return Err(Error::malformed_state(format!(
                    "allocation ({}, {}) references an unknown endpoint",
                    p, r
                )));
            }
            if count == 0 {
                return Err(Error::malformed_state(format!(
                    "allocation ({}, {}) has zero count",
                    p, r
                )));
            }
            *held.entry(r).or_insert(0) += u64::from(count);
        }

        for (p, r) in self.requests.keys() {
            if !self.processes.contains(p) || !self.resources.contains_key(r) {
                return Err(Error::malformed_state(format!(
                    "request ({}, {}) references an unknown endpoint",
                    p, r
                )));
            }
        }

        for (r, counts) in &self.resources {
            if counts.available > counts.total {
                return Err(Error::malformed_state(format!(
                    "resource {} has available {} above total {}",
                    r, counts.available, counts.total
                )));
            }
            let allocated = held.get(r).copied().unwrap_or(0);
            if u64::from(counts.held()) != allocated {
                return Err(Error::malformed_state(format!(
                    "resource {}: counters say {} held (total {}, available {}) but allocations sum to {}",
                    r,
                    counts.held(),
                    counts.total,
                    counts.available,
                    allocated
                )));
            }
        }

        Ok(())
    }

    fn ensure_endpoints(&self, process: &ProcessId, resource: &ResourceId) -> Result<()> {
        if !self.processes.contains(process) {
            return Err(Error::unknown_entity(format!(
                "process {} does not exist",
                process
            )));
        }
        if !self.resources.contains_key(resource) {
            return Err(Error::unknown_entity(format!(
                "resource {} does not exist",
                resource
            )));
        }
        Ok(())
    }
}

impl Default for ResourceAllocationGraph {
    fn default() -> Self {
        Self::new()
    }
}
