//! JSON-RPC method implementations, organized by domain.
//!
//! Each sub-module exposes typed param/result structs and async handlers
//! that take `AppState` + params.

pub mod agents;
pub mod traces;
pub mod workflows;
