//! The Adapter Contract: the boundary interface between the core and a
//! concrete surface (CLI, MCP, GUI).

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AdapterError;
use crate::interaction::{InteractionRequest, InteractionResponse};
use crate::manifest::Manifest;
use crate::orchestrator::OrchestratorState;
use crate::result::ExecutionResult;

/// The capability set an adapter implements. The orchestrator is the only
/// caller; the adapter may not initiate state transitions and never holds a
/// reference to the executor — it only ever sees requests and produces
/// responses.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Produce raw input for validation. Called during `PRE_FLIGHT` when the
    /// caller did not supply input directly.
    async fn collect_input(&self, manifest: &Manifest) -> Result<Value, AdapterError>;

    /// Produce a response for a blocking interaction, or ignore the request
    /// entirely for non-blocking (`progress`/`info`) ones — the orchestrator
    /// still calls this for every request, but discards the return value
    /// when `requires_response` was false.
    async fn handle_interaction(&self, request: &InteractionRequest) -> Result<InteractionResponse, AdapterError>;

    /// Called exactly once per run, after the terminal state is reached.
    async fn render_output(&self, result: &ExecutionResult, manifest: &Manifest);

    /// Optional observer of state transitions.
    async fn on_state_change(&self, _from: OrchestratorState, _to: OrchestratorState) {}
}
