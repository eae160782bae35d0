//! Library crate for httpx-mcp-rs: runs ProjectDiscovery `httpx` on behalf of MCP clients.
pub mod ansi;
pub mod args;
pub mod error;
pub mod mcp;
pub mod runner;
pub mod server;
pub mod stdio;
pub mod tool;
pub mod types;

pub use error::{ToolError, ToolResult};
pub use tool::HttpxTool;
pub use types::{ScanRequest, ToolResponse};
