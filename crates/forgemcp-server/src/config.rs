//! Command line and environment configuration.

use std::{path::PathBuf, sync::Arc};

use clap::{Args, Parser, Subcommand};
use forgemcp::{ALL_TOOLSETS, Connection, Error, Result, ServerOptions};

use crate::{
    backend::{FixtureBackend, ForgeBackend},
    catalog::{self, DEFAULT_TOOLSETS},
};

/// Keyword expanding to [`DEFAULT_TOOLSETS`].
pub const DEFAULT_KEYWORD: &str = "default";

/// Log lines kept by the job log tool unless configured otherwise.
pub const DEFAULT_CONTENT_WINDOW_SIZE: usize = 5000;

#[derive(Parser, Debug)]
#[command(name = "forgemcp", version)]
#[command(about = "MCP server exposing code forge operations as toggleable toolsets", long_about = None)]
/// Top level command line.
pub struct Cli {
    #[command(subcommand)]
    /// What to run.
    pub command: Command,

    /// Log filter, for example `info` or `forgemcp=debug`.
    #[arg(long, env = "RUST_LOG", global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
/// Supported subcommands.
pub enum Command {
    /// Serve MCP over stdin/stdout.
    Stdio(ServerArgs),
    /// Print the tool catalogue grouped by toolset.
    Tools(ToolsArgs),
}

/// Options shaping the served toolsets.
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Comma-separated toolsets to enable; `all` enables everything and
    /// `default` expands to the default selection.
    #[arg(long, env = "FORGEMCP_TOOLSETS", value_delimiter = ',', default_value = DEFAULT_KEYWORD)]
    pub toolsets: Vec<String>,

    /// Comma-separated tools to expose regardless of toolset state.
    #[arg(long, env = "FORGEMCP_TOOLS", value_delimiter = ',')]
    pub tools: Vec<String>,

    /// Hide every tool that modifies remote state.
    #[arg(long, env = "FORGEMCP_READ_ONLY")]
    pub read_only: bool,

    /// Expose tools that let the client discover and enable toolsets.
    #[arg(long, env = "FORGEMCP_DYNAMIC_TOOLSETS")]
    pub dynamic_toolsets: bool,

    /// Maximum number of log lines the job log tool returns.
    #[arg(long, env = "FORGEMCP_CONTENT_WINDOW_SIZE", default_value_t = DEFAULT_CONTENT_WINDOW_SIZE)]
    pub content_window_size: usize,

    /// Do not send usage instructions to the client.
    #[arg(long, env = "DISABLE_INSTRUCTIONS")]
    pub disable_instructions: bool,

    /// Directory of recorded `<operation>.json` responses.
    #[arg(long, env = "FORGEMCP_FIXTURES")]
    pub fixtures: Option<PathBuf>,
}

/// Options for the `tools` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ToolsArgs {
    /// Tools to select; prints the matching `--tools` argument.
    #[arg(long, value_delimiter = ',')]
    pub select: Vec<String>,
}

/// Resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Toolset ids enabled at startup, with `default` expanded.
    pub toolsets: Vec<String>,
    /// Tools exposed individually.
    pub tools: Vec<String>,
    /// Hide write tools.
    pub read_only: bool,
    /// Serve the discovery toolset.
    pub dynamic_toolsets: bool,
    /// Log line budget of the job log tool.
    pub content_window_size: usize,
    /// Send no instructions on initialize.
    pub disable_instructions: bool,
    /// Fixture directory for the replaying backend.
    pub fixtures: Option<PathBuf>,
}

impl ServerArgs {
    /// Normalize the arguments.
    ///
    /// Ids are trimmed and deduplicated, `default` is expanded, and `all` is
    /// dropped in dynamic mode so discovery starts from the explicit list.
    pub fn resolve(self) -> Result<Config> {
        if self.content_window_size == 0 {
            return Err(Error::InvalidConfiguration(
                "content window size must be at least 1".into(),
            ));
        }
        let mut toolsets: Vec<String> = Vec::new();
        for id in clean(self.toolsets) {
            let expanded = if id == DEFAULT_KEYWORD {
                DEFAULT_TOOLSETS.iter().map(|id| id.to_string()).collect()
            } else {
                vec![id]
            };
            for id in expanded {
                if !toolsets.contains(&id) {
                    toolsets.push(id);
                }
            }
        }
        if self.dynamic_toolsets {
            toolsets.retain(|id| id != ALL_TOOLSETS);
        }
        let mut tools: Vec<String> = Vec::new();
        for name in clean(self.tools) {
            if !tools.contains(&name) {
                tools.push(name);
            }
        }
        Ok(Config {
            toolsets,
            tools,
            read_only: self.read_only,
            dynamic_toolsets: self.dynamic_toolsets,
            content_window_size: self.content_window_size,
            disable_instructions: self.disable_instructions,
            fixtures: self.fixtures,
        })
    }
}

fn clean(values: Vec<String>) -> impl Iterator<Item = String> {
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Config {
    /// Options for each served connection.
    pub fn server_options(&self) -> ServerOptions {
        ServerOptions {
            dynamic_toolsets: self.dynamic_toolsets,
            tools: self.tools.clone(),
            disable_instructions: self.disable_instructions,
            ..ServerOptions::default()
        }
    }

    /// The backend selected by this configuration.
    pub fn backend(&self) -> Arc<dyn ForgeBackend> {
        Arc::new(FixtureBackend::new(self.fixtures.clone()))
    }

    /// Build a connection with a fresh toolset group.
    ///
    /// Unknown toolset or tool ids are configuration errors.
    pub fn connection(&self, backend: Arc<dyn ForgeBackend>) -> Result<Connection> {
        let group =
            catalog::toolset_group(self.read_only, backend, self.content_window_size)?;
        group.enable_toolsets(self.toolsets.as_slice())?;
        Connection::new(Arc::new(group), self.server_options())
    }
}
