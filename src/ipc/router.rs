//! Top-level IPC router: routes by service, delegates to handlers.

use crate::graph::ResourceAllocationGraph;
use crate::ipc::handlers;
use crate::types::{Error, Result};
use serde_json::Value;

/// Route an IPC request to the appropriate service handler.
pub fn route_request(
    graph: &mut ResourceAllocationGraph,
    service: &str,
    method: &str,
    body: Value,
) -> Result<Value> {
    match service {
        "graph" => handlers::graph::handle(graph, method, body),
        _ => Err(Error::unknown_entity(format!("Unknown service: {}", service))),
    }
}

// =============================================================================
// Shared helpers for handler modules
// =============================================================================

pub fn str_field(body: &Value, key: &str) -> Result<String> {
    body.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| Error::invalid_argument(format!("Missing required field: {}", key)))
}

/// Optional string field; absent, null and empty all read as `None`.
pub fn opt_str_field<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}
