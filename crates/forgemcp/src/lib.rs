//! # forgemcp
//!
//! A toolset registry and dynamic-dispatch MCP server core for exposing a
//! code forge's API as individually togglable tools.
//!
//! ## Overview
//!
//! Operations are registered as [`ServerTool`]s inside named [`Toolset`]s,
//! which are collected in a [`ToolsetGroup`]. The group enforces a global
//! read-only policy and is the single source of truth for what a client can
//! call. The [`dynamic`] tools let a client list, preview and enable toolsets
//! mid-session; every activation publishes the new tools on the [`Session`]
//! and emits `notifications/tools/list_changed`.
//!
//! Around the registry sit the output [`governor`] for unbounded results and
//! the [`instructions`] synthesizer that turns the enabled toolsets into a
//! briefing for the calling agent.
//!
//! ## Serving
//!
//! [`Server`] speaks newline-delimited JSON-RPC over stdio or any pair of
//! async streams, building a fresh [`Connection`] per client.

/// Argument envelope used by tool calls and prompt arguments.
mod arguments;
/// Handler context type.
mod context;
/// Error types and Result alias.
mod error;
/// Toolset group registry.
mod group;
/// JSON-RPC response helpers.
mod jsonrpc;
/// Server loop and per-connection dispatch.
mod server;
/// Session tool visibility state.
mod session;
/// Tool and prompt descriptors.
mod tool;
/// Toolset type.
mod toolset;

pub mod dynamic;
pub mod governor;
pub mod instructions;
/// Public schema types for MCP messages.
pub mod schema;
pub mod testutils;

pub use arguments::Arguments;
pub use context::ServerCtx;
pub use error::{Error, Result};
pub use group::{ALL_TOOLSETS, Activation, ToolsetGroup, ToolsetInfo};
pub use server::{Connection, Server, ServerHandle, ServerOptions};
pub use session::{Publication, Session, ToolSink};
pub use tool::{ServerPrompt, ServerTool, ToolFuture, ToolHandler};
pub use toolset::Toolset;

// Re-export schemars for tool parameter types
pub use schemars;
