//! RPC methods for trace inspection.
//!
//! Methods:
//! - `traces.list` — recent trace summaries, most recent first
//! - `traces.get`  — all spans of one trace, ordered by start time

use serde::{Deserialize, Serialize};

use crate::error::ServerError;
use crate::rpc::error::RpcError;
use crate::state::AppState;
use crate::trace::{Span, TraceSummary};

pub const DEFAULT_LIST_LIMIT: usize = 20;

// ---------------------------------------------------------------------------
// traces.list
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_LIST_LIMIT
}

#[derive(Debug, Serialize)]
pub struct ListResult {
    pub traces: Vec<TraceSummary>,
}

pub async fn list(state: &AppState, params: ListParams) -> Result<ListResult, RpcError> {
    let traces = state
        .traces
        .list_recent_traces(params.limit)
        .map_err(ServerError::from)?;
    Ok(ListResult { traces })
}

// ---------------------------------------------------------------------------
// traces.get
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetParams {
    pub trace_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetResult {
    pub trace_id: String,
    /// Empty for an unknown trace id.
    pub spans: Vec<Span>,
}

pub async fn get(state: &AppState, params: GetParams) -> Result<GetResult, RpcError> {
    let spans = state
        .traces
        .get_spans(&params.trace_id)
        .map_err(ServerError::from)?;
    Ok(GetResult {
        trace_id: params.trace_id,
        spans,
    })
}
