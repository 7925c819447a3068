//! # RAG Engine - Resource Allocation Graph with Deadlock Detection
//!
//! Rust implementation of a resource allocation graph providing:
//! - Process and multi-instance resource registration with auto-naming
//! - Request and allocation edges with counting invariants
//! - Deadlock detection by graph reduction over available instances
//! - Textual (JSON) snapshot export and validated import
//! - TCP IPC surface for out-of-process collaborators
//!
//! ## Architecture
//!
//! The graph engine owns all mutable state; the IPC server shares it behind
//! one lock:
//! ```text
//!                    ┌─────────────────────────────────┐
//!   IPC requests →   │   Arc<Mutex<ResourceAllocation  │
//!                    │             Graph>>             │
//!                    │  ┌──────────┐ ┌──────────┐      │
//!                    │  │processes │ │resources │      │
//!                    │  └──────────┘ └──────────┘      │
//!                    │  ┌──────────┐ ┌──────────┐      │
//!                    │  │allocation│ │ request  │      │
//!                    │  │  edges   │ │  edges   │      │
//!                    │  └──────────┘ └──────────┘      │
//!                    └─────────────────────────────────┘
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

// Re-export public API
pub mod graph;
pub mod ipc;
pub mod types;

// Internal utilities
pub mod observability;
pub mod validation;

pub use graph::{DeadlockReport, ResourceAllocationGraph, ResourceCounts, Snapshot};
pub use types::{Config, Error, ProcessId, ResourceId, Result};
