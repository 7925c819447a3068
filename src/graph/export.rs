//! Graph export to the textual snapshot format.
//!
//! Output is deterministic: processes are sorted and every map is keyed in
//! order, so two equal graphs export byte-identical text.

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;

use super::types::{encode_edge_key, ResourceCounts};
use super::ResourceAllocationGraph;
use crate::types::Result;

/// Structured form of the snapshot.
///
/// Edge maps are keyed by `"process|resource"`. A key repeated inside any
/// map fails deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub processes: Vec<String>,
    #[serde(deserialize_with = "unique_keys")]
    pub resources: BTreeMap<String, ResourceCounts>,
    #[serde(deserialize_with = "unique_keys")]
    pub allocations: BTreeMap<String, u32>,
    #[serde(deserialize_with = "unique_keys")]
    pub requests: BTreeMap<String, u32>,
}

/// Build a map, rejecting repeated keys instead of keeping the last value.
fn unique_keys<'de, D, V>(deserializer: D) -> std::result::Result<BTreeMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct UniqueKeys<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for UniqueKeys<V> {
        type Value = BTreeMap<String, V>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map with unique keys")
        }

        fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut map = BTreeMap::new();
            while let Some((key, value)) = access.next_entry::<String, V>()? {
                if map.contains_key(&key) {
                    return Err(de::Error::custom(format!("duplicate key {:?}", key)));
                }
                map.insert(key, value);
            }
            Ok(map)
        }
    }

    deserializer.deserialize_map(UniqueKeys(PhantomData))
}

impl ResourceAllocationGraph {
    /// Capture the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            processes: self.processes.iter().map(|p| p.to_string()).collect(),
            resources: self
                .resources
                .iter()
                .map(|(r, counts)| (r.to_string(), *counts))
                .collect(),
            allocations: self
                .allocations
                .iter()
                .map(|((p, r), &count)| (encode_edge_key(p, r), count))
                .collect(),
            requests: self
                .requests
                .iter()
                .map(|((p, r), &count)| (encode_edge_key(p, r), count))
                .collect(),
        }
    }

    /// Export the state as pretty-printed JSON.
    pub fn export_state(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }

    /// Write [`Self::export_state`] output to `path`.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.export_state()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProcessId, ResourceId};

    #[test]
    fn test_snapshot_shape() {
        let mut g = ResourceAllocationGraph::new();
        let p1 = g.register_process(None).unwrap();
        let p2 = g.register_process(None).unwrap();
        let r1 = g.register_resource(None, Some(2)).unwrap();
        g.allocate(&p1, &r1, 1).unwrap();
        g.request(&p2, &r1, 2).unwrap();

        let snap = g.snapshot();
        assert_eq!(snap.processes, vec!["P1", "P2"]);
        assert_eq!(
            snap.resources.get("R1"),
            Some(&ResourceCounts {
                total: 2,
                available: 1
            })
        );
        assert_eq!(snap.allocations.get("P1|R1"), Some(&1));
        assert_eq!(snap.requests.get("P2|R1"), Some(&2));
    }

    #[test]
    fn test_export_is_deterministic() {
        let build = |order: &[&str]| {
            let mut g = ResourceAllocationGraph::new();
            for label in order {
                g.register_process(Some(label)).unwrap();
            }
            g.register_resource(Some("R"), Some(3)).unwrap();
            for label in order {
                g.allocate(&ProcessId::must(label), &ResourceId::must("R"), 1)
                    .unwrap();
            }
            g.export_state().unwrap()
        };
        assert_eq!(build(&["a", "b", "c"]), build(&["c", "a", "b"]));
    }

    #[test]
    fn test_export_empty() {
        let g = ResourceAllocationGraph::new();
        let value: serde_json::Value = serde_json::from_str(&g.export_state().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "processes": [],
                "resources": {},
                "allocations": {},
                "requests": {}
            })
        );
    }
}
