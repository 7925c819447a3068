//! Core types for the RAG engine.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: Strongly-typed identifiers (ProcessId, ResourceId)
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for engine, server, and IPC

mod config;
mod errors;
mod ids;

pub use config::{Config, EngineConfig, IpcConfig, ObservabilityConfig, ServerConfig};
pub use errors::{Error, Result};
pub use ids::{ProcessId, ResourceId, KEY_DELIMITER};
