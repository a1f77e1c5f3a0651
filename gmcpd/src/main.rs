//! Gradle MCP server.
//!
//! Exposes a safe, structured subset of Gradle operations to MCP hosts
//! over JSON-RPC stdio: project and task discovery, validated task
//! execution, and cleaning.

#![forbid(unsafe_code)]

mod rpc;
mod server;
mod tools;

use anyhow::Result;
use clap::Parser;
use gmcp_common::config::ServerConfig;
use gmcp_common::gateway::TaskGateway;
use gmcp_common::logging::{LogConfig, init_logging};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "gmcpd")]
#[command(
    author,
    version,
    about = "Gradle MCP server - safe Gradle task execution for agents"
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Shared server context passed to all tool handlers.
pub struct ServerContext {
    /// Task execution gateway.
    pub gateway: TaskGateway,
    /// Resolved Gradle wrapper path.
    pub wrapper: PathBuf,
    /// Project root all commands run in.
    pub project_root: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configuration and wrapper errors go to stderr directly: they must
    // reach the operator even when logging never came up or is filtered.
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("gmcpd: {e}");
            std::process::exit(2);
        }
    };

    let mut log_config = LogConfig::new(config.log_level.value.clone())
        .with_stderr()
        .with_json(config.log_json.value);
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    if let Some(path) = &config.log_file.value {
        log_config = log_config.with_file(path.clone());
    }
    let _guards = init_logging(&log_config)?;

    info!(version = env!("CARGO_PKG_VERSION"), "starting gmcpd");
    config.log_summary();

    let wrapper = match config.resolve_wrapper() {
        Ok(wrapper) => wrapper,
        Err(e) => {
            eprintln!("gmcpd: {e}");
            std::process::exit(2);
        }
    };
    let project_root = config.project_root.value.clone();
    info!(
        wrapper = %wrapper.display(),
        project_root = %project_root.display(),
        "gradle wrapper resolved"
    );

    let gateway = TaskGateway::new(wrapper.clone(), project_root.clone())
        .with_timeout(config.task_timeout.value);

    server::serve(ServerContext {
        gateway,
        wrapper,
        project_root,
    })
    .await
}
