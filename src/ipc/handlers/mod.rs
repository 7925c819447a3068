//! Per-service IPC handlers.

pub mod graph;
pub mod validation;
