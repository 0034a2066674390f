//! MCP server exposing a single PDA as one tool.

use std::borrow::Cow;
use std::sync::Arc;

use pda_core::{Adapter, Executor, ExecutionResult, FileHandleStore, Manifest};
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
    ProtocolVersion, ServerCapabilities, ServerInfo, Tool as McpTool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::transport::io::stdio;
use rmcp::{ErrorData, ServerHandler, ServiceExt};

use crate::adapter::McpAdapter;
use crate::error::McpError;

/// MCP server exposing one PDA's manifest as a single MCP tool.
pub struct PdaMcpServer {
    manifest: Manifest,
    executor: Arc<dyn Executor>,
    file_store: Arc<dyn FileHandleStore>,
}

impl PdaMcpServer {
    /// Build a server for the given app.
    pub fn new(manifest: Manifest, executor: Arc<dyn Executor>, file_store: Arc<dyn FileHandleStore>) -> Self {
        Self { manifest, executor, file_store }
    }

    /// Serve over stdio until the client disconnects.
    pub async fn serve_stdio(self) -> Result<(), McpError> {
        let transport = stdio();
        let handler = PdaMcpHandler {
            manifest: self.manifest,
            executor: self.executor,
            file_store: self.file_store,
        };
        let service = handler.serve(transport).await.map_err(|e| McpError::Transport(e.to_string()))?;
        service.waiting().await.map_err(|e| McpError::Transport(e.to_string()))?;
        Ok(())
    }
}

struct PdaMcpHandler {
    manifest: Manifest,
    executor: Arc<dyn Executor>,
    file_store: Arc<dyn FileHandleStore>,
}

impl ServerHandler for PdaMcpHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.manifest.id.clone(),
                version: self.manifest.version.clone().unwrap_or_else(|| "0.1.0".to_string()),
                ..Default::default()
            },
            instructions: self.manifest.description.clone(),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        let schema = pda_core::to_portable_schema(&self.manifest.input_schema)
            .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
        let schema_obj = schema.as_object().cloned().unwrap_or_default();

        let tool = McpTool {
            name: Cow::Owned(self.manifest.id.clone()),
            title: None,
            description: self.manifest.description.clone().map(Cow::Owned),
            input_schema: Arc::new(schema_obj),
            output_schema: None,
            annotations: None,
            execution: None,
            icons: None,
            meta: None,
        };
        Ok(ListToolsResult::with_all_items(vec![tool]))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        if *request.name != *self.manifest.id {
            return Err(ErrorData::invalid_params(format!("tool not found: {}", request.name), None));
        }

        let input = match request.arguments {
            Some(map) => serde_json::Value::Object(map),
            None => serde_json::Value::Object(serde_json::Map::new()),
        };

        let orchestrator = pda_runtime::Orchestrator::new();
        let adapter: Arc<dyn Adapter> = Arc::new(McpAdapter::new(context.peer.clone()));

        let result = orchestrator
            .run(&self.manifest, Arc::clone(&self.executor), adapter, Arc::clone(&self.file_store), Some(input))
            .await
            .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;

        Ok(to_mcp_result(&result))
    }
}

/// Convert the terminal `ExecutionResult` of a run into MCP's content
/// format: one text block per file (handle, filename, mime type, size),
/// plus the data or error; `isError` is set when the run failed.
pub fn to_mcp_result(result: &ExecutionResult) -> CallToolResult {
    let mut blocks = Vec::new();

    if result.success {
        if let Some(data) = &result.data {
            let text = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
            blocks.push(Content::text(text));
        }
        if let Some(files) = &result.files {
            for file in files {
                blocks.push(Content::text(format!(
                    "file: handle={} filename={} mime={} size={}",
                    file.handle.as_str(),
                    file.filename.as_deref().unwrap_or(""),
                    file.mime_type,
                    file.size
                )));
            }
        }
        CallToolResult::success(blocks)
    } else {
        let message = result.error.clone().unwrap_or_else(|| "run failed".to_string());
        CallToolResult::error(vec![Content::text(format!("Error: {message}"))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pda_core::DurationMs;
    use serde_json::json;

    #[test]
    fn success_result_emits_data_block() {
        let result = ExecutionResult::success(json!({"sum": 4}), DurationMs::from_millis(10));
        let mcp_result = to_mcp_result(&result);
        assert_eq!(mcp_result.is_error, Some(false));
    }

    #[test]
    fn failure_result_is_marked_as_error() {
        let result = ExecutionResult::failure("division by zero", None, DurationMs::from_millis(5));
        let mcp_result = to_mcp_result(&result);
        assert_eq!(mcp_result.is_error, Some(true));
    }
}
