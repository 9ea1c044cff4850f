use std::{io, result::Result as StdResult};

use thiserror::Error;

use crate::schema::{
    CallToolResult, ErrorObject, INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, JSONRPCError,
    METHOD_NOT_FOUND, PARSE_ERROR, RESOURCE_NOT_FOUND, RequestId,
};

#[derive(Error, Debug, Clone)]
/// Error type for registry and session operations.
pub enum Error {
    /// Registration-time defect such as a duplicate tool or toolset id.
    ///
    /// These are fatal at bootstrap and never surface to a runtime caller.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A toolset id that is not registered in the group.
    #[error("Toolset not found: {id} (available: {})", available.join(", "))]
    ToolsetNotFound {
        /// The id that was requested.
        id: String,
        /// Ids that are registered, sorted.
        available: Vec<String>,
    },

    /// Tool not found error.
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// A call that breaks a registry policy, such as targeting the discovery
    /// toolset or invoking a write tool under the read-only policy.
    #[error("Policy violation: {0}")]
    PolicyViolation(String),

    /// Invalid parameters error.
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// I/O error with a message.
    #[error("IO error: {message}")]
    Io {
        /// Error message details.
        message: String,
    },

    /// JSON serialization or parsing error.
    #[error("JSON serialization error: {message}")]
    JsonParse {
        /// Error message details.
        message: String,
    },

    /// Transport-layer error.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Invalid request error.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Method not found error.
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Prompt not found error.
    #[error("Prompt not found: {0}")]
    PromptNotFound(String),

    /// No readable resource at a URI.
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Tool execution failed error.
    #[error("Tool execution failed for '{tool}': {message}")]
    ToolExecutionFailed {
        /// Tool name that failed.
        tool: String,
        /// Error message details.
        message: String,
    },
}

impl Error {
    /// Create a ToolExecutionFailed error
    pub fn tool_execution_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecutionFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Whether a calling agent can react to this error and retry.
    ///
    /// Everything except configuration defects and broken transports is
    /// recoverable.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::InvalidConfiguration(_) | Self::Transport(_) | Self::Io { .. }
        )
    }

    /// Render this error as a tool result flagged with `isError`.
    ///
    /// Registry failures travel through the normal result channel so the agent
    /// can re-list toolsets and adjust instead of seeing a protocol fault.
    pub fn into_tool_result(self) -> CallToolResult {
        let mut result = CallToolResult::new().with_text_content(self.to_string());
        if let Self::ToolsetNotFound { id, available } = &self {
            result = result.with_structured_content(serde_json::json!({
                "error": "toolset_not_found",
                "toolset": id,
                "available_toolsets": available,
            }));
        }
        result.mark_as_error()
    }

    /// Convert error to a specific JSONRPC response if applicable
    pub(crate) fn to_jsonrpc_response(&self, request_id: RequestId) -> Option<JSONRPCError> {
        let (code, message) = match self {
            Self::ToolNotFound(tool_name) => {
                (METHOD_NOT_FOUND, format!("Tool not found: {tool_name}"))
            }
            Self::MethodNotFound(method_name) => {
                (METHOD_NOT_FOUND, format!("Method not found: {method_name}"))
            }
            Self::PromptNotFound(name) => (INVALID_PARAMS, format!("Prompt not found: {name}")),
            Self::ResourceNotFound(uri) => (RESOURCE_NOT_FOUND, format!("Resource not found: {uri}")),
            Self::InvalidParams(message) => {
                (INVALID_PARAMS, format!("Invalid parameters: {message}"))
            }
            Self::InvalidRequest(msg) => (INVALID_REQUEST, format!("Invalid request: {msg}")),
            Self::JsonParse { message } => {
                (PARSE_ERROR, format!("JSON serialization error: {message}"))
            }
            _ => return None,
        };

        Some(JSONRPCError {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(request_id),
            error: ErrorObject {
                code,
                message,
                data: None,
            },
        })
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
        }
    }
}

/// Result alias using the crate error type.
pub type Result<T> = StdResult<T, Error>;
