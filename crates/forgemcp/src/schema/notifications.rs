use serde_json::Value;

use super::{JSONRPC_VERSION, JSONRPCNotification};

/// Notifications a server pushes to its connected client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerNotification {
    /// The set of callable tools changed.
    ToolListChanged,
    /// The set of prompts changed.
    PromptListChanged,
    /// The set of resources or resource templates changed.
    ResourceListChanged,
}

impl ServerNotification {
    /// The JSON-RPC method name for this notification.
    pub fn method(&self) -> &'static str {
        match self {
            Self::ToolListChanged => "notifications/tools/list_changed",
            Self::PromptListChanged => "notifications/prompts/list_changed",
            Self::ResourceListChanged => "notifications/resources/list_changed",
        }
    }

    /// Encode as a JSON-RPC notification frame.
    pub fn to_jsonrpc(&self) -> JSONRPCNotification {
        JSONRPCNotification {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: self.method().to_string(),
            params: None::<Value>,
        }
    }
}
