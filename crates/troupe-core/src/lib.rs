//! Troupe Core — transport-agnostic agent orchestration engine.
//!
//! Registers agents (persona + model binding + tools), runs workflows over
//! them with sequential, parallel and supervisor strategies, and records a
//! span tree per run. It has **no HTTP framework dependency** by default,
//! making it suitable for use in:
//!
//! - HTTP servers (via `troupe-server`)
//! - CLI tools (via `troupe-cli`)
//!
//! # Feature Flags
//!
//! - `axum` — Enables `IntoResponse` impl on `ServerError` for use in axum handlers.

pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod models;
pub mod orchestration;
pub mod rpc;
pub mod state;
pub mod store;
pub mod trace;

// Convenience re-exports
pub use config::EngineConfig;
pub use db::Database;
pub use error::ServerError;
pub use state::{AppState, AppStateInner};
