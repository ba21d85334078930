//! Jira MCP server binary.
//!
//! Serves the Jira tools over stdio by default, or over WebSocket when a port
//! is given.
//!
//! ```bash
//! ATLASSIAN_HOST=example.atlassian.net \
//! ATLASSIAN_EMAIL=dev@example.com \
//! ATLASSIAN_TOKEN=... \
//!   jira-mcp --env .env --port 8080
//! ```

use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use jira_mcp::config::{load_env_file, read_only_from_env, ConfigError, Credentials};
use jira_mcp::jira::{JiraClientConfig, JiraError};
use jira_mcp::logging::init_logging;
use jira_mcp::mcp::tools::jira::{register_jira_tools, JiraClients};
use jira_mcp::mcp::tools::registry::log_registered_tools;
use jira_mcp::mcp::tools::{ToolRegistry, ToolRegistryConfig};
use jira_mcp::mcp::errors::MCPError;
use jira_mcp::mcp::MCPServer;

/// MCP server exposing Jira issue, worklog, workflow and sprint tools
#[derive(Parser, Debug)]
#[command(name = "jira-mcp")]
#[command(version)]
struct Cli {
    /// Env file to load before reading credentials
    #[arg(long)]
    env: Option<PathBuf>,

    /// Serve MCP over WebSocket on this port instead of stdio (not SSE)
    #[arg(long)]
    port: Option<u16>,

    /// Listen address for the network transport
    #[arg(long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Upper bound on a single tool invocation, in seconds
    #[arg(long, default_value_t = 300)]
    tool_timeout_secs: u64,
}

/// Fatal startup and serving failures
#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to create Jira client: {0}")]
    Client(#[from] JiraError),

    #[error("Failed to register tools: {0}")]
    Registration(#[source] MCPError),

    #[error("Server error: {0}")]
    Server(#[source] MCPError),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_guard = init_logging(cli.log_file.as_deref());

    let code = match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    };

    // Flushes the file writer before the process exits.
    drop(log_guard);
    code
}

async fn run(cli: Cli) -> Result<(), StartupError> {
    if let Some(path) = &cli.env {
        match load_env_file(path) {
            Ok(()) => info!("Loaded environment from {}", path.display()),
            Err(e) => warn!("{}", e),
        }
    }

    let credentials = Credentials::from_env()?;

    let read_only = read_only_from_env();
    if read_only {
        info!("Read-only mode enabled, mutating tools are disabled");
    }

    let clients = JiraClients::connect(&credentials, &JiraClientConfig::default())?;

    let registry = Arc::new(ToolRegistry::with_config(ToolRegistryConfig {
        default_timeout: Duration::from_secs(cli.tool_timeout_secs),
    }));

    register_jira_tools(&registry, &clients, read_only)
        .await
        .map_err(StartupError::Registration)?;
    log_registered_tools(&registry).await;

    let server = MCPServer::new(registry);
    match cli.port {
        Some(port) => {
            Arc::new(server)
                .serve_websocket(SocketAddr::new(cli.bind, port))
                .await
        }
        None => server.serve_stdio().await,
    }
    .map_err(StartupError::Server)
}
