#![warn(missing_docs)]
//! # pda — umbrella crate
//!
//! A single import surface for building Protocol-Driven Applications: a
//! manifest-described app, driven by an [`Executor`](pda_core::Executor),
//! run against a pluggable [`Adapter`](pda_core::Adapter) (CLI, MCP, or a
//! caller-supplied one), with optional access to the fault-tolerant vendor
//! `Pool` for apps that call out to unreliable backends.
//!
//! Re-exports the protocol crate and reference implementations behind
//! feature flags, plus a [`prelude`] for the common path of building an
//! [`App`] and running it.

#[cfg(feature = "core")]
pub use pda_core;
pub use pda_runtime;
#[cfg(feature = "adapter-cli")]
pub use pda_adapter_cli;
#[cfg(feature = "adapter-mcp")]
pub use pda_adapter_mcp;
#[cfg(feature = "pool")]
pub use pda_pool;
#[cfg(feature = "store-fs")]
pub use pda_store_fs;
#[cfg(feature = "store-memory")]
pub use pda_store_memory;
#[cfg(feature = "vendor")]
pub use pda_vendor;

use std::sync::Arc;

use pda_core::{Adapter, Executor, ExecutionResult, FileHandleStore, Manifest, OrchError, SchemaError};
use pda_runtime::Orchestrator;
use serde::Serialize;
use serde_json::Value;

/// The portable tool definition an app exposes to a host: the manifest's
/// identity plus its input schema translated to the portable JSON Schema
/// subset understood outside this crate.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    /// The manifest's id, also used as the tool name.
    pub name: String,
    /// The manifest's description, if any.
    pub description: Option<String>,
    /// The portable-schema rendering of the manifest's input schema.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// A runnable Protocol-Driven Application: a manifest paired with the
/// executor and file store that give it behavior. One `App` can be run
/// against any number of adapters, sequentially or concurrently, since
/// each run builds its own [`Orchestrator`].
pub struct App {
    manifest: Manifest,
    executor: Arc<dyn Executor>,
    file_store: Arc<dyn FileHandleStore>,
}

impl App {
    /// Build an app from its manifest, executor, and file store.
    pub fn new(manifest: Manifest, executor: Arc<dyn Executor>, file_store: Arc<dyn FileHandleStore>) -> Self {
        Self { manifest, executor, file_store }
    }

    /// The app's manifest.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Run the app against the given adapter. `input`, when supplied,
    /// bypasses `adapter.collect_input` entirely.
    pub async fn run(&self, adapter: Arc<dyn Adapter>, input: Option<Value>) -> Result<ExecutionResult, OrchError> {
        let orchestrator = Orchestrator::new();
        orchestrator
            .run(&self.manifest, Arc::clone(&self.executor), adapter, Arc::clone(&self.file_store), input)
            .await
    }

    /// The app's MCP tool definition: `{name, description, inputSchema}`.
    pub fn get_mcp_tool_definition(&self) -> Result<ToolDefinition, SchemaError> {
        Ok(ToolDefinition {
            name: self.manifest.id.clone(),
            description: self.manifest.description.clone(),
            input_schema: pda_core::to_portable_schema(&self.manifest.input_schema)?,
        })
    }
}

#[cfg(feature = "adapter-cli")]
impl App {
    /// Wire a CLI adapter built from `args` (`--<field>=<value>` pairs,
    /// coerced per field type) and run to completion.
    pub async fn run_cli(&self, args: Vec<String>) -> Result<ExecutionResult, OrchError> {
        let orchestrator = Orchestrator::new();
        let adapter: Arc<dyn Adapter> = Arc::new(pda_adapter_cli::CliAdapter::new(args));
        orchestrator
            .run(&self.manifest, Arc::clone(&self.executor), adapter, Arc::clone(&self.file_store), None)
            .await
    }
}

#[cfg(feature = "adapter-mcp")]
impl App {
    /// Build a fresh MCP server for this app, ready to serve tool calls
    /// over stdio. Each call to `call_tool` drives its own orchestrator run.
    pub fn create_mcp_server(&self) -> pda_adapter_mcp::PdaMcpServer {
        pda_adapter_mcp::PdaMcpServer::new(self.manifest.clone(), Arc::clone(&self.executor), Arc::clone(&self.file_store))
    }
}

/// Happy-path imports for building and running a PDA.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use pda_core::{
        Adapter, DurationMs, ExecutionContext, ExecutionResult, Executor, ExecutorError,
        ExecutorMessage, FileHandleStore, InteractionRequest, InteractionResponse,
        InteractionType, Manifest, OrchError, OrchestratorState,
    };

    pub use pda_runtime::Orchestrator;

    pub use crate::{App, ToolDefinition};

    #[cfg(feature = "adapter-cli")]
    pub use pda_adapter_cli::CliAdapter;

    #[cfg(feature = "adapter-mcp")]
    pub use pda_adapter_mcp::{McpAdapter, PdaMcpServer};

    #[cfg(feature = "store-memory")]
    pub use pda_store_memory::MemoryFileStore;

    #[cfg(feature = "store-fs")]
    pub use pda_store_fs::{FsFileStore, FsKeyValueStore};

    #[cfg(feature = "vendor")]
    pub use pda_vendor::{Backend, ErrorClass, Vendor, VendorError, VendorState};

    #[cfg(feature = "pool")]
    pub use pda_pool::{DispatchOutcome, EscalationContext, Pool, PoolConfig, PoolError};
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pda_core::{ExecutionContext, ExecutorError};

    struct Echo;

    #[async_trait]
    impl Executor for Echo {
        async fn run(&self, ctx: ExecutionContext, input: Value) -> Result<Value, ExecutorError> {
            let _ = ctx;
            Ok(input)
        }
    }

    fn manifest() -> Manifest {
        Manifest::new(
            "echo",
            "Echo",
            serde_json::json!({"type": "object", "properties": {"msg": {"type": "string"}}, "required": ["msg"]}),
            serde_json::json!({"type": "string"}),
        )
        .with_description("echoes its input back")
    }

    #[tokio::test]
    async fn run_with_explicit_input_bypasses_collection() {
        let app = App::new(manifest(), Arc::new(Echo), Arc::new(pda_store_memory::MemoryFileStore::new()));
        struct NoCollect;
        #[async_trait]
        impl Adapter for NoCollect {
            async fn collect_input(&self, _manifest: &Manifest) -> Result<Value, pda_core::AdapterError> {
                panic!("collect_input should not be called when input is supplied")
            }
            async fn handle_interaction(
                &self,
                request: &pda_core::InteractionRequest,
            ) -> Result<pda_core::InteractionResponse, pda_core::AdapterError> {
                Ok(pda_core::InteractionResponse::new(request.request_id.clone(), Value::Null))
            }
            async fn render_output(&self, _result: &ExecutionResult, _manifest: &Manifest) {}
            async fn on_state_change(&self, _from: pda_core::OrchestratorState, _to: pda_core::OrchestratorState) {}
        }

        let result = app
            .run(Arc::new(NoCollect), Some(serde_json::json!({"msg": "hi"})))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.data, Some(serde_json::json!({"msg": "hi"})));
    }

    #[test]
    fn mcp_tool_definition_uses_manifest_identity() {
        let app = App::new(manifest(), Arc::new(Echo), Arc::new(pda_store_memory::MemoryFileStore::new()));
        let def = app.get_mcp_tool_definition().unwrap();
        assert_eq!(def.name, "echo");
        assert_eq!(def.description.as_deref(), Some("echoes its input back"));
    }
}
