use std::sync::atomic::{AtomicBool, Ordering};

use crate::{schema::ResourceTemplate, tool::ServerPrompt, tool::ServerTool};

/// A named feature area: its read tools, write tools and auxiliary descriptors.
///
/// Toolsets are built once at bootstrap and handed to a
/// [`ToolsetGroup`](crate::ToolsetGroup), which validates them. Only the
/// `enabled` flag changes afterwards.
pub struct Toolset {
    /// Stable key, e.g. `issues`.
    id: String,
    /// Human-readable description.
    description: String,
    /// Tools that never mutate remote state, in insertion order.
    read_tools: Vec<ServerTool>,
    /// Tools that mutate remote state, in insertion order.
    write_tools: Vec<ServerTool>,
    /// Resource templates published while enabled.
    resource_templates: Vec<ResourceTemplate>,
    /// Prompts published while enabled.
    prompts: Vec<ServerPrompt>,
    /// Whether the toolset is currently exposed.
    enabled: AtomicBool,
}

impl Toolset {
    /// Create an empty, disabled toolset.
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            read_tools: Vec::new(),
            write_tools: Vec::new(),
            resource_templates: Vec::new(),
            prompts: Vec::new(),
            enabled: AtomicBool::new(false),
        }
    }

    /// Set the initial enabled state.
    pub fn with_enabled(self, enabled: bool) -> Self {
        self.enabled.store(enabled, Ordering::SeqCst);
        self
    }

    /// Append read tools.
    pub fn add_read_tools(mut self, tools: impl IntoIterator<Item = ServerTool>) -> Self {
        self.read_tools.extend(tools);
        self
    }

    /// Append write tools.
    pub fn add_write_tools(mut self, tools: impl IntoIterator<Item = ServerTool>) -> Self {
        self.write_tools.extend(tools);
        self
    }

    /// Append resource templates.
    pub fn add_resource_templates(
        mut self,
        templates: impl IntoIterator<Item = ResourceTemplate>,
    ) -> Self {
        self.resource_templates.extend(templates);
        self
    }

    /// Append prompts.
    pub fn add_prompts(mut self, prompts: impl IntoIterator<Item = ServerPrompt>) -> Self {
        self.prompts.extend(prompts);
        self
    }

    /// Toolset id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Toolset description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Read tools in insertion order.
    pub fn read_tools(&self) -> &[ServerTool] {
        &self.read_tools
    }

    /// Write tools in insertion order.
    pub fn write_tools(&self) -> &[ServerTool] {
        &self.write_tools
    }

    /// Resource templates.
    pub fn resource_templates(&self) -> &[ResourceTemplate] {
        &self.resource_templates
    }

    /// Prompts.
    pub fn prompts(&self) -> &[ServerPrompt] {
        &self.prompts
    }

    /// Tools a client may see under the given read-only policy.
    ///
    /// Read tools come first, then write tools, each in insertion order. Under
    /// read-only the write tools are omitted entirely.
    pub fn available_tools(&self, read_only: bool) -> Vec<&ServerTool> {
        let writes: &[ServerTool] = if read_only { &[] } else { &self.write_tools };
        self.read_tools.iter().chain(writes).collect()
    }

    /// Look up one of this toolset's tools by name.
    pub fn tool(&self, name: &str) -> Option<&ServerTool> {
        self.read_tools
            .iter()
            .chain(&self.write_tools)
            .find(|tool| tool.name() == name)
    }

    /// Whether the toolset is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Set the enabled flag, returning whether it changed.
    ///
    /// Setting the current value again is a no-op.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        self.enabled.swap(enabled, Ordering::SeqCst) != enabled
    }
}

impl std::fmt::Debug for Toolset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolset")
            .field("id", &self.id)
            .field("read_tools", &self.read_tools.len())
            .field("write_tools", &self.write_tools.len())
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::schema::{CallToolResult, Tool, ToolSchema};

    fn tool(name: String, read_only: bool) -> ServerTool {
        ServerTool::new(
            Tool::new(name, ToolSchema::empty()).with_read_only_hint(read_only),
            |_, _| Box::pin(async { Ok(CallToolResult::new()) }),
        )
    }

    fn toolset(reads: usize, writes: usize) -> Toolset {
        Toolset::new("t", "test")
            .add_read_tools((0..reads).map(|i| tool(format!("read_{i}"), true)))
            .add_write_tools((0..writes).map(|i| tool(format!("write_{i}"), false)))
    }

    #[test]
    fn test_available_tools_keep_insertion_order() {
        let toolset = Toolset::new("repos", "Repositories")
            .add_write_tools([tool("create_branch".into(), false)])
            .add_read_tools([tool("search".into(), true), tool("get_commit".into(), true)]);
        let names: Vec<_> = toolset
            .available_tools(false)
            .into_iter()
            .map(ServerTool::name)
            .collect();
        assert_eq!(names, vec!["search", "get_commit", "create_branch"]);
        assert!(toolset.tool("create_branch").is_some());
    }

    #[test]
    fn test_set_enabled_is_idempotent() {
        let toolset = toolset(1, 0);
        assert!(!toolset.is_enabled());
        assert!(toolset.set_enabled(true));
        assert!(!toolset.set_enabled(true));
        assert!(toolset.is_enabled());
    }

    proptest! {
        #[test]
        fn read_only_projection(reads in 0usize..12, writes in 0usize..12) {
            let toolset = toolset(reads, writes);
            let ro = toolset.available_tools(true);
            prop_assert_eq!(ro.len(), reads);
            prop_assert!(ro.iter().all(|tool| tool.is_read_only()));
            prop_assert_eq!(toolset.available_tools(false).len(), reads + writes);
        }
    }
}
