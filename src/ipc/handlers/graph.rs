//! Graph service handler: registration, edge mutations, detection, snapshots.

use crate::graph::{ResourceAllocationGraph, Snapshot};
use crate::ipc::handlers::validation::{count_field, opt_count_field};
use crate::ipc::router::{opt_str_field, str_field};
use crate::types::{Error, ProcessId, ResourceId, Result};
use crate::validation::{parse_process_id, parse_resource_id};
use serde_json::{json, Value};

pub fn handle(graph: &mut ResourceAllocationGraph, method: &str, body: Value) -> Result<Value> {
    match method {
        "RegisterProcess" => {
            let pid = graph.register_process(opt_str_field(&body, "id"))?;
            Ok(json!({ "id": pid }))
        }

        "RegisterResource" => {
            let instances = opt_count_field(&body, "instances")?;
            let rid = graph.register_resource(opt_str_field(&body, "id"), instances)?;
            let counts = graph
                .resource(&rid)
                .copied()
                .ok_or_else(|| Error::unknown_entity(format!("resource {} not found", rid)))?;
            Ok(json!({
                "id": rid,
                "total": counts.total,
                "available": counts.available,
            }))
        }

        "Request" => {
            let (pid, rid) = parse_edge(&body)?;
            let count = count_field(&body, "count", 1)?;
            graph.request(&pid, &rid, count)?;
            Ok(json!({
                "process": pid,
                "resource": rid,
                "pending": graph.request_count(&pid, &rid),
            }))
        }

        "CancelRequest" => {
            let (pid, rid) = parse_edge(&body)?;
            let count = count_field(&body, "count", 1)?;
            let withdrawn = graph.cancel_request(&pid, &rid, count)?;
            Ok(json!({
                "process": pid,
                "resource": rid,
                "withdrawn": withdrawn,
                "pending": graph.request_count(&pid, &rid),
            }))
        }

        "Allocate" => {
            let (pid, rid) = parse_edge(&body)?;
            let count = count_field(&body, "count", 1)?;
            graph.allocate(&pid, &rid, count)?;
            Ok(edge_state(graph, &pid, &rid))
        }

        "Release" => {
            let (pid, rid) = parse_edge(&body)?;
            let count = count_field(&body, "count", 1)?;
            let released = graph.release(&pid, &rid, count)?;
            let mut value = edge_state(graph, &pid, &rid);
            value["released"] = json!(released);
            Ok(value)
        }

        "RemoveProcess" => {
            let pid = parse_process_id(&str_field(&body, "id")?)?;
            graph.remove_process(&pid)?;
            Ok(json!({ "removed": pid }))
        }

        "RemoveResource" => {
            let rid = parse_resource_id(&str_field(&body, "id")?)?;
            graph.remove_resource(&rid)?;
            Ok(json!({ "removed": rid }))
        }

        "DetectDeadlock" => {
            let report = graph.detect_deadlock();
            Ok(serde_json::to_value(report)?)
        }

        "ExportState" => Ok(json!({ "state": graph.export_state()? })),

        "ImportState" => {
            match body.get("state") {
                Some(Value::String(text)) => graph.import_state(text)?,
                Some(value @ Value::Object(_)) => {
                    let snapshot: Snapshot = serde_json::from_value(value.clone())
                        .map_err(|e| Error::malformed_state(format!("invalid snapshot: {}", e)))?;
                    graph.restore(snapshot)?;
                }
                _ => {
                    return Err(Error::malformed_state(
                        "state must be a snapshot string or object",
                    ))
                }
            }
            Ok(json!({
                "processes": graph.process_count(),
                "resources": graph.resource_count(),
            }))
        }

        "GetState" => Ok(serde_json::to_value(graph.snapshot())?),

        "Reset" => {
            graph.reset();
            Ok(json!({}))
        }

        _ => Err(Error::unknown_entity(format!("Unknown graph method: {}", method))),
    }
}

// =============================================================================
// Graph-specific helpers
// =============================================================================

fn parse_edge(body: &Value) -> Result<(ProcessId, ResourceId)> {
    let pid = parse_process_id(&str_field(body, "process")?)?;
    let rid = parse_resource_id(&str_field(body, "resource")?)?;
    Ok((pid, rid))
}

fn edge_state(graph: &ResourceAllocationGraph, pid: &ProcessId, rid: &ResourceId) -> Value {
    json!({
        "process": pid,
        "resource": rid,
        "held": graph.allocation(pid, rid),
        "available": graph.resource(rid).map(|c| c.available),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(graph: &mut ResourceAllocationGraph, method: &str, body: Value) -> Result<Value> {
        handle(graph, method, body)
    }

    #[test]
    fn test_register_and_allocate() {
        let mut g = ResourceAllocationGraph::new();
        let p = call(&mut g, "RegisterProcess", json!({})).unwrap();
        assert_eq!(p["id"], "P1");

        let r = call(&mut g, "RegisterResource", json!({"instances": 2})).unwrap();
        assert_eq!(r, json!({"id": "R1", "total": 2, "available": 2}));

        let a = call(
            &mut g,
            "Allocate",
            json!({"process": "P1", "resource": "R1", "count": 2}),
        )
        .unwrap();
        assert_eq!(a["held"], 2);
        assert_eq!(a["available"], 0);
    }

    #[test]
    fn test_release_reports_amount() {
        let mut g = ResourceAllocationGraph::new();
        call(&mut g, "RegisterProcess", json!({"id": "A"})).unwrap();
        call(&mut g, "RegisterResource", json!({"id": "X", "instances": 3})).unwrap();
        call(&mut g, "Allocate", json!({"process": "A", "resource": "X", "count": 2})).unwrap();

        let v = call(&mut g, "Release", json!({"process": "A", "resource": "X", "count": 5})).unwrap();
        assert_eq!(v["released"], 2);
        assert_eq!(v["held"], 0);
        assert_eq!(v["available"], 3);
    }

    #[test]
    fn test_negative_counts_rejected() {
        let mut g = ResourceAllocationGraph::new();
        let err = call(&mut g, "RegisterResource", json!({"instances": -1})).unwrap_err();
        assert_eq!(err.to_ipc_error_code(), "INVALID_ARGUMENT");
        assert_eq!(g.resource_count(), 0);

        call(&mut g, "RegisterProcess", json!({})).unwrap();
        call(&mut g, "RegisterResource", json!({})).unwrap();
        let err = call(&mut g, "Request", json!({"process": "P1", "resource": "R1", "count": 0}))
            .unwrap_err();
        assert_eq!(err.to_ipc_error_code(), "INVALID_ARGUMENT");
    }

    #[test]
    fn test_detect_deadlock_value() {
        let mut g = ResourceAllocationGraph::new();
        for _ in 0..2 {
            call(&mut g, "RegisterProcess", json!({})).unwrap();
            call(&mut g, "RegisterResource", json!({})).unwrap();
        }
        call(&mut g, "Allocate", json!({"process": "P1", "resource": "R1"})).unwrap();
        call(&mut g, "Allocate", json!({"process": "P2", "resource": "R2"})).unwrap();
        call(&mut g, "Request", json!({"process": "P1", "resource": "R2"})).unwrap();
        call(&mut g, "Request", json!({"process": "P2", "resource": "R1"})).unwrap();

        let v = call(&mut g, "DetectDeadlock", json!({})).unwrap();
        assert_eq!(v["deadlocked"], true);
        assert_eq!(v["blocked"], json!(["P1", "P2"]));
    }

    #[test]
    fn test_import_accepts_text_and_object() {
        let mut source = ResourceAllocationGraph::new();
        source.register_process(None).unwrap();
        source.register_resource(None, Some(2)).unwrap();
        let text = source.export_state().unwrap();

        let mut g = ResourceAllocationGraph::new();
        let v = call(&mut g, "ImportState", json!({ "state": text })).unwrap();
        assert_eq!(v, json!({"processes": 1, "resources": 1}));

        let object = serde_json::to_value(source.snapshot()).unwrap();
        let mut g = ResourceAllocationGraph::new();
        call(&mut g, "ImportState", json!({ "state": object })).unwrap();
        assert_eq!(g.snapshot(), source.snapshot());

        let err = call(&mut g, "ImportState", json!({ "state": 5 })).unwrap_err();
        assert_eq!(err.to_ipc_error_code(), "MALFORMED_STATE");
    }

    #[test]
    fn test_unknown_method() {
        let mut g = ResourceAllocationGraph::new();
        let err = call(&mut g, "Preempt", json!({})).unwrap_err();
        assert!(err.to_string().contains("Unknown graph method"));
    }

    #[test]
    fn test_missing_field() {
        let mut g = ResourceAllocationGraph::new();
        let err = call(&mut g, "Allocate", json!({"process": "P1"})).unwrap_err();
        assert!(err.to_string().contains("Missing required field: resource"));
    }
}
