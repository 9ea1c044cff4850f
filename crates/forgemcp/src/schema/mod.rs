//! MCP protocol schema types.
//!
//! Only the subset of the Model Context Protocol that a tool-serving session
//! needs lives here: JSON-RPC framing, initialization, tools, prompts, resource
//! templates and server notifications.
#![allow(missing_docs)]

/// Content payload types.
mod content;
/// Initialization types.
mod initialization;
/// JSON-RPC 2.0 message types and constants for the MCP protocol.
mod jsonrpc;
/// Server notification types.
mod notifications;
/// Prompt types.
mod prompts;
/// Resource and resource template types.
mod resources;
/// Tool schema types.
mod tools;

pub use content::*;
pub use initialization::*;
pub use jsonrpc::*;
pub use notifications::*;
pub use prompts::*;
pub use resources::*;
pub use tools::*;
