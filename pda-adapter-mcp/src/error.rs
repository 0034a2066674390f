//! Error type for MCP adapter setup and serving.

use thiserror::Error;

/// Failure setting up or serving the MCP adapter. Per-run failures (bad
/// input, executor errors) never surface here — they're reported through
/// the `CallToolResult`'s `isError` flag per [`crate::to_mcp_result`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum McpError {
    /// The transport (stdio, child process, ...) failed to connect or serve.
    #[error("mcp transport error: {0}")]
    Transport(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
