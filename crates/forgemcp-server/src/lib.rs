//! The `forgemcp` server: a forge toolset catalogue served over MCP.
//!
//! The binary wires [`config`] into a per-connection
//! [`ToolsetGroup`](forgemcp::ToolsetGroup) built from the [`catalog`], with
//! tool calls passed through a [`backend::ForgeBackend`].

pub mod backend;
pub mod catalog;
pub mod config;
pub mod job_logs;
pub mod listing;
pub mod logging;

use std::sync::Arc;

use forgemcp::{Result, Server};
use tracing::info;

use crate::{
    backend::FixtureBackend,
    config::{Config, DEFAULT_CONTENT_WINDOW_SIZE, ToolsArgs},
};

/// Serve on stdin/stdout until the client disconnects.
pub async fn run_stdio(config: Config) -> Result<()> {
    let backend = config.backend();
    // Surface configuration errors before the transport starts.
    config.connection(backend.clone())?;
    info!(
        toolsets = ?config.toolsets,
        read_only = config.read_only,
        dynamic = config.dynamic_toolsets,
        "starting forge MCP server on stdio"
    );
    Server::new(move || config.connection(backend.clone()))
        .serve_stdio()
        .await
}

/// Render the `tools` listing.
pub fn run_tools(args: &ToolsArgs) -> Result<String> {
    let group = catalog::toolset_group(
        false,
        Arc::new(FixtureBackend::default()),
        DEFAULT_CONTENT_WINDOW_SIZE,
    )?;
    listing::render(&listing::catalogue(&group)?, &args.select)
}
