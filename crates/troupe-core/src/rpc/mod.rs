//! Transport-agnostic JSON-RPC 2.0 layer.
//!
//! Exposes the registry, workflow runs and trace queries under one method
//! namespace, reused by:
//!
//! - **HTTP** — the axum endpoint at `/api/rpc`
//! - **CLI** — `troupe rpc --method ... --params ...`
//!
//! ```ignore
//! let router = RpcRouter::new(app_state);
//! let response = router.handle_request(r#"{
//!     "jsonrpc": "2.0",
//!     "id": 1,
//!     "method": "traces.list",
//!     "params": { "limit": 5 }
//! }"#).await;
//! ```

pub mod error;
pub mod methods;
pub mod router;
pub mod types;

pub use error::RpcError;
pub use router::RpcRouter;
pub use types::{JsonRpcRequest, JsonRpcResponse};
