use std::{fmt, sync::Arc};

use futures::future::BoxFuture;

use crate::{
    Arguments, Error, Result, ServerCtx,
    schema::{CallToolResult, ContentBlock, GetPromptResult, Prompt, PromptMessage, Role, Tool},
};

/// Shared boxed future type used by tool dispatch.
pub type ToolFuture<'a, T> = BoxFuture<'a, T>;

/// Execution logic behind a tool: validated arguments in, result or failure out.
pub type ToolHandler = Arc<
    dyn for<'a> Fn(&'a ServerCtx, Arguments) -> ToolFuture<'a, Result<CallToolResult>>
        + Send
        + Sync,
>;

/// A tool descriptor paired with its handler.
///
/// The read-only classification is taken from the tool's `readOnlyHint`
/// annotation, so the flag a client sees and the flag the registry enforces
/// can never disagree.
#[derive(Clone)]
pub struct ServerTool {
    /// Protocol-level definition advertised to clients.
    tool: Tool,
    /// Handler invoked on `tools/call`.
    handler: ToolHandler,
}

impl ServerTool {
    /// Pair a tool definition with a handler.
    pub fn new<F>(tool: Tool, handler: F) -> Self
    where
        F: for<'a> Fn(&'a ServerCtx, Arguments) -> ToolFuture<'a, Result<CallToolResult>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            tool,
            handler: Arc::new(handler),
        }
    }

    /// Unique tool name.
    pub fn name(&self) -> &str {
        &self.tool.name
    }

    /// Human description, empty if the tool has none.
    pub fn description(&self) -> &str {
        self.tool.description.as_deref().unwrap_or_default()
    }

    /// Whether the tool is annotated as read-only.
    pub fn is_read_only(&self) -> bool {
        self.tool.read_only_hint().unwrap_or(false)
    }

    /// The protocol definition.
    pub fn tool(&self) -> &Tool {
        &self.tool
    }

    /// Run the handler.
    pub async fn call(&self, ctx: &ServerCtx, arguments: Arguments) -> Result<CallToolResult> {
        (self.handler)(ctx, arguments).await
    }
}

impl fmt::Debug for ServerTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerTool")
            .field("name", &self.tool.name)
            .field("read_only", &self.is_read_only())
            .finish_non_exhaustive()
    }
}

/// A prompt together with the message templates it renders.
///
/// Templates reference arguments as `{name}`.
#[derive(Debug, Clone)]
pub struct ServerPrompt {
    prompt: Prompt,
    messages: Vec<(Role, String)>,
}

impl ServerPrompt {
    /// Create a prompt with no messages.
    pub fn new(prompt: Prompt) -> Self {
        Self {
            prompt,
            messages: Vec::new(),
        }
    }

    /// Append a message template.
    pub fn with_message(mut self, role: Role, template: impl Into<String>) -> Self {
        self.messages.push((role, template.into()));
        self
    }

    /// Prompt name.
    pub fn name(&self) -> &str {
        &self.prompt.name
    }

    /// The protocol definition.
    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    /// Render the messages with the given arguments.
    pub fn render(&self, arguments: &Arguments) -> Result<GetPromptResult> {
        for argument in &self.prompt.arguments {
            if argument.required && arguments.get(&argument.name).is_none() {
                return Err(Error::InvalidParams(format!(
                    "missing required argument: {}",
                    argument.name
                )));
            }
        }
        let messages = self
            .messages
            .iter()
            .map(|(role, template)| PromptMessage {
                role: *role,
                content: ContentBlock::text(substitute(template, arguments)),
            })
            .collect();
        Ok(GetPromptResult {
            description: self.prompt.description.clone(),
            messages,
        })
    }
}

/// Replace `{name}` placeholders with argument values; unknown placeholders
/// render as empty.
fn substitute(template: &str, arguments: &Arguments) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after[..end];
        match arguments.get(key) {
            Some(serde_json::Value::String(s)) => out.push_str(s),
            Some(other) => out.push_str(&other.to_string()),
            None => {}
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}
