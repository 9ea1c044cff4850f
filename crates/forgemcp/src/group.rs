use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    Error, Result,
    dynamic::DYNAMIC_TOOLSET_ID,
    session::{Publication, ToolSink},
    tool::ServerTool,
    toolset::Toolset,
};

/// Keyword that selects every registered toolset at bootstrap.
pub const ALL_TOOLSETS: &str = "all";

/// Information about a toolset for introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolsetInfo {
    /// Toolset id.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Whether the toolset is currently enabled.
    pub enabled: bool,
    /// Number of read tools.
    pub read_tools: usize,
    /// Number of write tools.
    pub write_tools: usize,
}

/// Outcome of a runtime activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// The toolset was enabled by this call; these tools became visible.
    Enabled {
        /// Names of the newly visible tools, read tools first.
        tools: Vec<String>,
    },
    /// The toolset was already enabled; nothing changed.
    AlreadyEnabled,
}

/// The registry of every toolset a server instance exposes.
///
/// Built mutably at bootstrap with [`add_toolset`](Self::add_toolset), then
/// shared behind an `Arc`. After bootstrap the only mutation is enabling a
/// toolset, which is serialized by a single activation lock.
pub struct ToolsetGroup {
    /// Toolsets keyed by id.
    toolsets: BTreeMap<String, Toolset>,
    /// Global policy hiding every write tool.
    read_only: bool,
    /// Serializes activation so check, flip, register and notify are atomic.
    activation_lock: Mutex<()>,
}

impl ToolsetGroup {
    /// Create an empty group with the given read-only policy.
    pub fn new(read_only: bool) -> Self {
        Self {
            toolsets: BTreeMap::new(),
            read_only,
            activation_lock: Mutex::new(()),
        }
    }

    /// Whether write tools are hidden.
    pub fn read_only(&self) -> bool {
        self.read_only
    }

    /// Register a toolset.
    ///
    /// Fails on a duplicate or reserved id, on a tool name that is already
    /// registered anywhere in the group, and on a tool whose read-only
    /// annotation contradicts the list it was filed under.
    pub fn add_toolset(&mut self, toolset: Toolset) -> Result<()> {
        let id = toolset.id().to_string();
        if id == DYNAMIC_TOOLSET_ID || id == ALL_TOOLSETS {
            return Err(Error::InvalidConfiguration(format!(
                "toolset id is reserved: {id}"
            )));
        }
        if self.toolsets.contains_key(&id) {
            return Err(Error::InvalidConfiguration(format!(
                "toolset already registered: {id}"
            )));
        }

        for tool in toolset.read_tools() {
            if !tool.is_read_only() {
                return Err(Error::InvalidConfiguration(format!(
                    "tool '{}' in toolset '{id}' is filed as read but not annotated read-only",
                    tool.name()
                )));
            }
        }
        for tool in toolset.write_tools() {
            if tool.is_read_only() {
                return Err(Error::InvalidConfiguration(format!(
                    "tool '{}' in toolset '{id}' is filed as write but annotated read-only",
                    tool.name()
                )));
            }
        }

        let mut seen: HashSet<&str> = self.all_tools().map(ServerTool::name).collect();
        for tool in toolset.available_tools(false) {
            if !seen.insert(tool.name()) {
                return Err(Error::InvalidConfiguration(format!(
                    "tool already registered: {}",
                    tool.name()
                )));
            }
        }

        debug!(
            toolset = %id,
            read_tools = toolset.read_tools().len(),
            write_tools = toolset.write_tools().len(),
            "registered toolset"
        );
        self.toolsets.insert(id, toolset);
        Ok(())
    }

    /// Look up a toolset by id.
    pub fn find_toolset(&self, id: &str) -> Result<&Toolset> {
        self.toolsets.get(id).ok_or_else(|| self.not_found(id))
    }

    /// Registered ids, sorted.
    pub fn toolset_ids(&self) -> Vec<String> {
        self.toolsets.keys().cloned().collect()
    }

    /// Every registered toolset, sorted by id.
    pub fn toolsets(&self) -> impl Iterator<Item = &Toolset> {
        self.toolsets.values()
    }

    /// Every toolset with its live state, sorted by id.
    pub fn list_toolsets(&self) -> Vec<ToolsetInfo> {
        self.toolsets
            .values()
            .map(|toolset| ToolsetInfo {
                id: toolset.id().to_string(),
                description: toolset.description().to_string(),
                enabled: toolset.is_enabled(),
                read_tools: toolset.read_tools().len(),
                write_tools: toolset.write_tools().len(),
            })
            .collect()
    }

    /// Whether a toolset is enabled; unknown ids are simply not enabled.
    pub fn is_enabled(&self, id: &str) -> bool {
        self.toolsets
            .get(id)
            .is_some_and(|toolset| toolset.is_enabled())
    }

    /// Ids of enabled toolsets, sorted.
    pub fn enabled_ids(&self) -> Vec<String> {
        self.toolsets
            .values()
            .filter(|toolset| toolset.is_enabled())
            .map(|toolset| toolset.id().to_string())
            .collect()
    }

    /// Enable toolsets at bootstrap, before any session exists.
    ///
    /// `all` selects every toolset. Unknown ids are configuration errors.
    pub fn enable_toolsets<S: AsRef<str>>(&self, ids: &[S]) -> Result<()> {
        for id in ids {
            let id = id.as_ref();
            if id == ALL_TOOLSETS {
                for toolset in self.toolsets.values() {
                    toolset.set_enabled(true);
                }
                continue;
            }
            let toolset = self.toolsets.get(id).ok_or_else(|| {
                Error::InvalidConfiguration(format!(
                    "unknown toolset: {id} (available: {})",
                    self.toolset_ids().join(", ")
                ))
            })?;
            toolset.set_enabled(true);
        }
        Ok(())
    }

    /// Find a tool by name in any toolset, enabled or not.
    pub fn find_tool(&self, name: &str) -> Option<(&Toolset, &ServerTool)> {
        self.toolsets
            .values()
            .find_map(|toolset| toolset.tool(name).map(|tool| (toolset, tool)))
    }

    /// Resolve individually selected tools.
    ///
    /// Unknown names, and write tools under the read-only policy, are
    /// configuration errors.
    pub fn select_tools<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<ServerTool>> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                let (_, tool) = self.find_tool(name).ok_or_else(|| {
                    Error::InvalidConfiguration(format!("unknown tool: {name}"))
                })?;
                if self.read_only && !tool.is_read_only() {
                    return Err(Error::InvalidConfiguration(format!(
                        "tool '{name}' is a write tool and the server is read-only"
                    )));
                }
                Ok(tool.clone())
            })
            .collect()
    }

    /// Push everything enabled toolsets expose into a sink.
    ///
    /// Used once per session before serving; emits no notification.
    pub fn register_enabled(&self, sink: &dyn ToolSink) -> Result<usize> {
        let mut count = 0;
        for toolset in self.toolsets.values().filter(|t| t.is_enabled()) {
            let publication = self.publication(toolset);
            count += publication.tools.len();
            sink.publish(publication)?;
        }
        Ok(count)
    }

    /// Enable a toolset during a live session.
    ///
    /// Holds the activation lock from the enabled check through registration
    /// and notification, so a concurrent call for the same toolset observes
    /// the completed activation and takes the no-op path. A sink that rejects
    /// the publication leaves the toolset disabled and nothing visible.
    pub async fn enable_toolset(&self, id: &str, sink: &dyn ToolSink) -> Result<Activation> {
        if id == DYNAMIC_TOOLSET_ID {
            return Err(Error::PolicyViolation(format!(
                "toolset '{DYNAMIC_TOOLSET_ID}' is always enabled and cannot be targeted"
            )));
        }
        let _guard = self.activation_lock.lock().await;
        let toolset = self.find_toolset(id)?;
        if toolset.is_enabled() {
            debug!(toolset = id, "toolset already enabled");
            return Ok(Activation::AlreadyEnabled);
        }

        let publication = self.publication(toolset);
        let tools = publication.tool_names();
        let notifications = publication.notifications();
        sink.publish(publication)?;
        toolset.set_enabled(true);
        for notification in notifications {
            sink.notify_list_changed(notification)?;
        }
        info!(toolset = id, tools = tools.len(), "enabled toolset");
        Ok(Activation::Enabled { tools })
    }

    /// Collect a toolset's visible tools and auxiliary descriptors.
    fn publication(&self, toolset: &Toolset) -> Publication {
        Publication {
            tools: toolset
                .available_tools(self.read_only)
                .into_iter()
                .cloned()
                .collect(),
            resource_templates: toolset.resource_templates().to_vec(),
            prompts: toolset.prompts().to_vec(),
        }
    }

    /// Every tool in the group regardless of state or policy.
    fn all_tools(&self) -> impl Iterator<Item = &ServerTool> {
        self.toolsets
            .values()
            .flat_map(|toolset| toolset.available_tools(false))
    }

    /// Build the not-found error for an id.
    fn not_found(&self, id: &str) -> Error {
        Error::ToolsetNotFound {
            id: id.to_string(),
            available: self.toolset_ids(),
        }
    }
}

impl std::fmt::Debug for ToolsetGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolsetGroup")
            .field("toolsets", &self.toolsets.values().collect::<Vec<_>>())
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}
