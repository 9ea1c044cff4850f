use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock},
};

use tokio::sync::broadcast;
use tracing::debug;

use crate::{
    Arguments, Error, Result, ServerCtx,
    schema::{
        CallToolResult, GetPromptResult, ListPromptsResult, ListResourceTemplatesResult,
        ListToolsResult, ResourceTemplate, ServerNotification,
    },
    tool::{ServerPrompt, ServerTool},
};

/// Capacity of the per-session notification channel.
const NOTIFICATION_CAPACITY: usize = 64;

/// Everything one toolset makes visible, published as a unit.
#[derive(Clone, Default)]
pub struct Publication {
    /// Tools in registration order.
    pub tools: Vec<ServerTool>,
    /// Resource templates.
    pub resource_templates: Vec<ResourceTemplate>,
    /// Prompts.
    pub prompts: Vec<ServerPrompt>,
}

impl Publication {
    /// Names of the published tools, in order.
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|tool| tool.name().to_string()).collect()
    }

    /// List-changed notifications a client needs once this is visible.
    ///
    /// The tool list notification is always sent; prompts and resources only
    /// when the publication carries any.
    pub fn notifications(&self) -> Vec<ServerNotification> {
        let mut notifications = vec![ServerNotification::ToolListChanged];
        if !self.resource_templates.is_empty() {
            notifications.push(ServerNotification::ResourceListChanged);
        }
        if !self.prompts.is_empty() {
            notifications.push(ServerNotification::PromptListChanged);
        }
        notifications
    }
}

/// Downstream consumer of activation results.
///
/// The registry pushes newly visible tools into a sink and then tells it what
/// changed; the sink owns whatever the client actually observes.
pub trait ToolSink: Send + Sync {
    /// Make a single tool callable.
    fn register_tool(&self, tool: ServerTool) -> Result<()>;

    /// Make a whole publication visible.
    ///
    /// Either every item becomes visible or, on error, none does.
    fn publish(&self, publication: Publication) -> Result<()>;

    /// Emit a list-changed notification.
    fn notify_list_changed(&self, notification: ServerNotification) -> Result<()>;

    /// Emit `notifications/tools/list_changed`.
    fn notify_tool_list_changed(&self) -> Result<()> {
        self.notify_list_changed(ServerNotification::ToolListChanged)
    }
}

/// Live tool visibility state of one client session.
///
/// Cloning is cheap and every clone observes the same state.
#[derive(Clone)]
pub struct Session {
    /// Callable tools keyed by name.
    tools: Arc<RwLock<BTreeMap<String, ServerTool>>>,
    /// Published resource templates keyed by name.
    templates: Arc<RwLock<BTreeMap<String, ResourceTemplate>>>,
    /// Published prompts keyed by name.
    prompts: Arc<RwLock<BTreeMap<String, ServerPrompt>>>,
    /// Outbound notifications to the client.
    notification_tx: broadcast::Sender<ServerNotification>,
}

impl Default for Session {
    fn default() -> Self {
        let (notification_tx, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            tools: Arc::default(),
            templates: Arc::default(),
            prompts: Arc::default(),
            notification_tx,
        }
    }
}

impl Session {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to notifications emitted on this session.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerNotification> {
        self.notification_tx.subscribe()
    }

    /// Send a notification to every subscriber.
    ///
    /// A session with no subscribers has no client to inform, so that case is
    /// not an error.
    pub fn notify(&self, notification: ServerNotification) -> Result<()> {
        if self.notification_tx.receiver_count() == 0 {
            debug!(method = notification.method(), "no subscribers for notification");
            return Ok(());
        }
        self.notification_tx
            .send(notification)
            .map_err(|_| Error::InternalError("Failed to send notification".into()))?;
        Ok(())
    }

    /// Whether a tool is currently callable.
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .contains_key(name)
    }

    /// Names of callable tools, sorted.
    pub fn tool_names(&self) -> Vec<String> {
        self.tools
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    /// List callable tools in name order.
    pub fn list_tools(&self) -> ListToolsResult {
        let tools = self
            .tools
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .values()
            .map(|tool| tool.tool().clone())
            .collect();
        ListToolsResult {
            tools,
            next_cursor: None,
        }
    }

    /// Call a tool by name.
    ///
    /// Returns `ToolNotFound` if the tool is not registered on this session.
    pub async fn call_tool(
        &self,
        ctx: &ServerCtx,
        name: &str,
        arguments: Arguments,
    ) -> Result<CallToolResult> {
        let tool = self
            .tools
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ToolNotFound(name.to_string()))?;
        tool.call(ctx, arguments).await
    }

    /// List published resource templates in name order.
    pub fn list_resource_templates(&self) -> ListResourceTemplatesResult {
        let resource_templates = self
            .templates
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .values()
            .cloned()
            .collect();
        ListResourceTemplatesResult {
            resource_templates,
            next_cursor: None,
        }
    }

    /// List published prompts in name order.
    pub fn list_prompts(&self) -> ListPromptsResult {
        let prompts = self
            .prompts
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .values()
            .map(|prompt| prompt.prompt().clone())
            .collect();
        ListPromptsResult {
            prompts,
            next_cursor: None,
        }
    }

    /// Render a published prompt.
    pub fn get_prompt(&self, name: &str, arguments: &Arguments) -> Result<GetPromptResult> {
        let prompt = self
            .prompts
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .get(name)
            .cloned()
            .ok_or_else(|| Error::PromptNotFound(name.to_string()))?;
        prompt.render(arguments)
    }
}

impl ToolSink for Session {
    fn register_tool(&self, tool: ServerTool) -> Result<()> {
        debug!(tool = tool.name(), "registering tool on session");
        self.tools
            .write()
            .unwrap_or_else(|err| err.into_inner())
            .insert(tool.name().to_string(), tool);
        Ok(())
    }

    fn publish(&self, publication: Publication) -> Result<()> {
        let Publication {
            tools,
            resource_templates,
            prompts,
        } = publication;
        // All three maps are locked before any insert so readers never see
        // half a publication.
        let mut tool_map = self.tools.write().unwrap_or_else(|err| err.into_inner());
        let mut template_map = self.templates.write().unwrap_or_else(|err| err.into_inner());
        let mut prompt_map = self.prompts.write().unwrap_or_else(|err| err.into_inner());
        debug!(
            tools = tools.len(),
            templates = resource_templates.len(),
            prompts = prompts.len(),
            "publishing on session"
        );
        for tool in tools {
            tool_map.insert(tool.name().to_string(), tool);
        }
        for template in resource_templates {
            template_map.insert(template.name.clone(), template);
        }
        for prompt in prompts {
            prompt_map.insert(prompt.name().to_string(), prompt);
        }
        Ok(())
    }

    fn notify_list_changed(&self, notification: ServerNotification) -> Result<()> {
        self.notify(notification)
    }
}
