use serde_json::{json, Value};
use tracing::{info, warn};

use crate::ansi;
use crate::args;
use crate::error::{ToolError, ToolResult};
use crate::runner::ProcessRunner;
use crate::types::{ScanRequest, ToolResponse};

pub const TOOL_NAME: &str = "httpx";
pub const TOOL_DESCRIPTION: &str =
    "Scans target domains to detect active HTTP/HTTPS services using ProjectDiscovery's httpx.";

/// The single remote-callable operation: build args, run the scanner, clean its output.
#[derive(Debug, Clone, Default)]
pub struct HttpxTool {
    runner: ProcessRunner,
}

impl HttpxTool {
    pub fn new(runner: ProcessRunner) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &ProcessRunner {
        &self.runner
    }

    pub async fn call(&self, req: &ScanRequest) -> ToolResult<ToolResponse> {
        let args = args::build_args(req)?;
        info!(
            targets = req.targets.len(),
            args = %args.join(" "),
            "running httpx"
        );

        match self.runner.run(&args).await {
            Ok(output) => Ok(ToolResponse {
                text: ansi::render_output(&output),
            }),
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "httpx call failed");
                Err(e)
            }
        }
    }

    /// MCP tool descriptor with its JSON input schema.
    pub fn definition() -> Value {
        json!({
            "name": TOOL_NAME,
            "description": TOOL_DESCRIPTION,
            "inputSchema": {
                "type": "object",
                "properties": {
                    "targets": {
                        "type": "array",
                        "items": { "type": "string" },
                        "minItems": 1,
                        "description": "A list of domain or hostnames to scan (e.g., example.com)."
                    },
                    "ports": {
                        "type": "array",
                        "items": { "type": "integer", "minimum": 1, "maximum": 65535 },
                        "description": "Optional list of ports to probe (e.g., 80, 443)."
                    },
                    "probes": {
                        "type": "array",
                        "items": { "type": "string", "pattern": "^[A-Za-z0-9_][A-Za-z0-9_-]*$" },
                        "description": "Optional list of httpx probes to enable (e.g., status-code, title, ip, cdn, tech-detect)."
                    }
                },
                "required": ["targets"],
                "additionalProperties": false
            }
        })
    }
}

/// Structured form of a failed call, for clients that want more than the message.
pub fn error_details(err: &ToolError) -> Value {
    let mut details = json!({
        "kind": err.kind(),
        "message": err.to_string(),
    });
    if let Some(code) = err.exit_code() {
        details["exitCode"] = json!(code);
    }
    if let Some(signal) = err.signal() {
        details["signal"] = json!(signal);
    }
    if let Some(stderr) = err.stderr() {
        details["stderr"] = json!(stderr);
    }
    details
}
