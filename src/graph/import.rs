//! Graph import from the textual snapshot format.
//!
//! Import is all-or-nothing: the snapshot is decoded and checked into a
//! scratch state, which only replaces the live state once every invariant
//! holds. Counters for auto-naming are kept, so names generated after an
//! import scan forward past whatever the snapshot brought in.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use super::export::Snapshot;
use super::types::EdgeKey;
use super::ResourceAllocationGraph;
use crate::types::{Error, ProcessId, ResourceId, Result, KEY_DELIMITER};

impl ResourceAllocationGraph {
    /// Replace all state from a JSON snapshot.
    pub fn import_state(&mut self, text: &str) -> Result<()> {
        let snapshot: Snapshot = serde_json::from_str(text)
            .map_err(|e| Error::malformed_state(format!("invalid snapshot: {}", e)))?;
        self.restore(snapshot)
    }

    /// Replace all state from a structured snapshot.
    pub fn restore(&mut self, snapshot: Snapshot) -> Result<()> {
        let mut scratch = ResourceAllocationGraph::with_config(self.config().clone());

        for label in &snapshot.processes {
            let pid = parse_process(label)?;
            if !scratch.processes.insert(pid) {
                return Err(Error::malformed_state(format!(
                    "duplicate process {}",
                    label
                )));
            }
        }

        for (label, counts) in &snapshot.resources {
            scratch.resources.insert(parse_resource(label)?, *counts);
        }

        scratch.allocations = decode_edges(&snapshot.allocations, "allocation", false)?;
        scratch.requests = decode_edges(&snapshot.requests, "request", true)?;

        scratch.check_invariants()?;

        self.processes = scratch.processes;
        self.resources = scratch.resources;
        self.allocations = scratch.allocations;
        self.requests = scratch.requests;

        tracing::debug!(
            processes = self.processes.len(),
            resources = self.resources.len(),
            "state imported"
        );
        Ok(())
    }

    /// Read a snapshot file written by [`Self::save_to_file`].
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let text = std::fs::read_to_string(path)?;
        self.import_state(&text)
    }

    /// Build a graph straight from a snapshot file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut graph = Self::new();
        graph.load_from_file(path)?;
        Ok(graph)
    }
}

fn parse_process(label: &str) -> Result<ProcessId> {
    ProcessId::from_string(label.to_string())
        .map_err(|e| Error::malformed_state(format!("{}: {:?}", e, label)))
}

fn parse_resource(label: &str) -> Result<ResourceId> {
    ResourceId::from_string(label.to_string())
        .map_err(|e| Error::malformed_state(format!("{}: {:?}", e, label)))
}

/// Split a `"process|resource"` key.
fn decode_edge_key(key: &str) -> Result<EdgeKey> {
    let (p, r) = key.split_once(KEY_DELIMITER).ok_or_else(|| {
        Error::malformed_state(format!("edge key {:?} is not \"process|resource\"", key))
    })?;
    Ok((parse_process(p)?, parse_resource(r)?))
}

/// Decode an edge map. Zero counts are dropped for requests and rejected for
/// allocations, which must be positive.
fn decode_edges(
    raw: &BTreeMap<String, u32>,
    kind: &str,
    allow_zero: bool,
) -> Result<HashMap<EdgeKey, u32>> {
    let mut edges = HashMap::with_capacity(raw.len());
    for (key, &count) in raw {
        let edge = decode_edge_key(key)?;
        if count == 0 {
            if allow_zero {
                continue;
            }
            return Err(Error::malformed_state(format!(
                "{} {} has zero count",
                kind, key
            )));
        }
        edges.insert(edge, count);
    }
    Ok(edges)
}
