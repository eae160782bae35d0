//! Newline-delimited JSON-RPC over stdin/stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::mcp::McpHandler;

/// Serve on the process's stdin/stdout until stdin closes.
pub async fn serve_stdio(handler: McpHandler) -> Result<()> {
    info!("serving MCP on stdio");
    serve_io(handler, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Read one message per line from `reader` and write one response per line to `writer`.
///
/// Every message runs in its own task so a slow scan does not hold up the next
/// request; a single writer task keeps output lines whole. At EOF the calls
/// still in flight finish before this returns.
pub async fn serve_io<R, W>(handler: McpHandler, reader: R, writer: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let handler = Arc::new(handler);
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(line) = rx.recv().await {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        writer.shutdown().await?;
        Ok::<_, std::io::Error>(())
    });

    let mut lines = BufReader::new(reader).lines();
    let mut set = JoinSet::new();

    while let Some(line) = lines.next_line().await.context("failed to read input")? {
        while set.try_join_next().is_some() {}

        if line.trim().is_empty() {
            continue;
        }
        let handler = handler.clone();
        let tx = tx.clone();
        set.spawn(async move {
            let Some(resp) = handler.handle_bytes(line.as_bytes()).await else {
                return;
            };
            match serde_json::to_string(&resp) {
                Ok(out) => {
                    if tx.send(out).is_err() {
                        debug!(id = %resp.id, "output writer gone, dropping response");
                    }
                }
                Err(e) => error!(error = %e, "failed to encode response"),
            }
        });
    }

    debug!(in_flight = set.len(), "input closed, waiting for in-flight calls");
    while set.join_next().await.is_some() {}

    drop(tx);
    writer
        .await
        .context("output writer task panicked")?
        .context("failed to write output")?;
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::time::{Duration, Instant};

    use serde_json::Value;
    use tokio::io::AsyncReadExt;

    use crate::runner::ProcessRunner;
    use crate::tool::HttpxTool;

    fn call(id: u32, target: &str) -> String {
        format!(
            r#"{{"jsonrpc":"2.0","id":{id},"method":"tools/call","params":{{"name":"httpx","arguments":{{"targets":["{target}"]}}}}}}"#
        )
    }

    #[tokio::test]
    async fn overlapping_calls_each_get_one_line() {
        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("httpx");
        // argv is: -u <targets> -silent
        fs::write(&script, "#!/bin/sh\nsleep 2\nprintf '%s\\n' \"$2\"\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        let handler = McpHandler::new(HttpxTool::new(ProcessRunner::new(&script)));

        let (mut input, input_rx) = tokio::io::duplex(64 * 1024);
        let (output_tx, mut output) = tokio::io::duplex(64 * 1024);

        let started = Instant::now();
        let server = tokio::spawn(serve_io(handler, input_rx, output_tx));

        let messages = format!(
            "{}\n{}\n\n{}\n",
            call(1, "a.test"),
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            call(2, "b.test"),
        );
        input.write_all(messages.as_bytes()).await.unwrap();
        drop(input);

        let mut raw = String::new();
        output.read_to_string(&mut raw).await.unwrap();
        server.await.unwrap().unwrap();
        let elapsed = started.elapsed();

        let replies: HashMap<u64, String> = raw
            .lines()
            .map(|line| {
                let v: Value = serde_json::from_str(line).unwrap();
                let text = v["result"]["content"][0]["text"].as_str().unwrap().to_string();
                (v["id"].as_u64().unwrap(), text)
            })
            .collect();

        assert_eq!(raw.lines().count(), 2, "{raw}");
        assert_eq!(replies[&1], "a.test");
        assert_eq!(replies[&2], "b.test");
        // two 2s calls finishing well under 4s ran side by side
        assert!(elapsed < Duration::from_millis(3500), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn garbage_line_gets_parse_error() {
        let handler = McpHandler::new(HttpxTool::new(ProcessRunner::new("/nonexistent/httpx")));
        let (mut input, input_rx) = tokio::io::duplex(4096);
        let (output_tx, mut output) = tokio::io::duplex(4096);
        let server = tokio::spawn(serve_io(handler, input_rx, output_tx));

        input
            .write_all(b"garbage\n{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"ping\"}\n")
            .await
            .unwrap();
        drop(input);

        let mut raw = String::new();
        output.read_to_string(&mut raw).await.unwrap();
        server.await.unwrap().unwrap();

        let lines: Vec<Value> = raw.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().any(|v| v["error"]["code"] == -32700));
        assert!(lines.iter().any(|v| v["id"] == 9 && v["result"] == serde_json::json!({})));
    }
}
