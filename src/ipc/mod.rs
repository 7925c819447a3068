//! TCP+msgpack IPC transport layer.
//!
//! Lets an out-of-process collaborator (a GUI, a script) drive the graph
//! engine with length-prefixed msgpack frames. Requests look like
//! `{id, service, method, body}`; responses are `{id, ok: true, body}` or
//! `{id, ok: false, error: {code, message}}`.

pub mod codec;
pub mod handlers;
pub mod router;
pub mod server;

pub use server::IpcServer;
