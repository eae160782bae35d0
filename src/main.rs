use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use httpx_mcp_rs::mcp::McpHandler;
use httpx_mcp_rs::runner::{ProcessRunner, BINARY_ENV, DEFAULT_BINARY, DEFAULT_MAX_OUTPUT_BYTES};
use httpx_mcp_rs::{server, stdio, HttpxTool, ScanRequest};

/// httpx-mcp-rs — MCP tool server wrapping ProjectDiscovery httpx.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "httpx-mcp-rs",
    version,
    about = "MCP tool server that runs ProjectDiscovery httpx and relays its cleaned output.",
    long_about = None
)]
struct Cli {
    /// Path to the httpx binary. Looked up through PATH when it is a bare name.
    #[arg(long = "httpx-path", env = BINARY_ENV, default_value = DEFAULT_BINARY, global = true)]
    httpx_path: PathBuf,

    /// Per-stream capture limit in bytes (0 = unlimited).
    #[arg(
        long = "max-output-bytes",
        env = "HTTPX_MAX_OUTPUT_BYTES",
        default_value_t = DEFAULT_MAX_OUTPUT_BYTES,
        global = true
    )]
    max_output_bytes: usize,

    /// Log output format. Logs always go to stderr.
    #[arg(long = "log-format", env = "HTTPX_MCP_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Serve MCP over HTTP (POST /mcp).
    Serve {
        /// Address to listen on.
        #[arg(long, env = "HTTPX_MCP_BIND", default_value = "127.0.0.1:3000")]
        bind: String,

        /// Request ceiling in seconds (0 disables it).
        #[arg(long = "max-duration", env = "HTTPX_MCP_MAX_DURATION", default_value_t = server::DEFAULT_MAX_DURATION.as_secs())]
        max_duration: u64,
    },
    /// Serve MCP over stdin/stdout.
    Stdio,
    /// Run one scan and print the result.
    Scan {
        /// Host or domain to probe (repeatable).
        #[arg(short = 't', long = "target", required = true)]
        targets: Vec<String>,

        /// Port to probe (repeatable).
        #[arg(short = 'p', long = "port")]
        ports: Vec<u16>,

        /// httpx probe to enable, without the leading dash (repeatable).
        #[arg(long = "probe")]
        probes: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let limit = (cli.max_output_bytes > 0).then_some(cli.max_output_bytes);
    let runner = ProcessRunner::new(&cli.httpx_path).with_max_output_bytes(limit);
    info!(
        binary = %runner.binary().display(),
        max_output_bytes = ?runner.max_output_bytes(),
        "httpx-mcp-rs {} starting",
        env!("CARGO_PKG_VERSION")
    );
    let tool = HttpxTool::new(runner);

    match cli.command {
        Command::Serve { bind, max_duration } => {
            let ceiling = (max_duration > 0).then(|| Duration::from_secs(max_duration));
            server::spawn_server(&bind, McpHandler::new(tool), ceiling).await?;
        }
        Command::Stdio => {
            stdio::serve_stdio(McpHandler::new(tool)).await?;
        }
        Command::Scan {
            targets,
            ports,
            probes,
        } => {
            let mut req = ScanRequest::new(targets);
            if !ports.is_empty() {
                req = req.with_ports(ports);
            }
            if !probes.is_empty() {
                req = req.with_probes(probes);
            }
            let resp = tool.call(&req).await?;
            println!("{}", resp.text);
        }
    }

    Ok(())
}

fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("httpx_mcp_rs=info,tower_http=info"));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}
