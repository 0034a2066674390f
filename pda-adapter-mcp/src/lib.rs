#![warn(missing_docs)]
//! The MCP adapter: exposes a single PDA as one MCP tool.
//!
//! `call_tool` validates and runs the app directly against the supplied
//! arguments (bypassing `collect_input` — the orchestrator always prefers
//! caller-supplied input). Blocking interactions are translated into
//! natural-language prompts and round-tripped through the connected
//! client's sampling capability (`create_message`), the same
//! peer-callback shape used when bridging tool calls client-side.

pub mod adapter;
pub mod error;
pub mod server;

pub use adapter::{format_interaction_for_ai, parse_ai_response, McpAdapter};
pub use error::McpError;
pub use server::{to_mcp_result, PdaMcpServer};
