//! Discovery tools that let a client inspect and enable toolsets at runtime.
//!
//! The discovery toolset sits outside the [`ToolsetGroup`] it describes and
//! is always enabled. Every failure is reported as a tool result with
//! `isError` set so the calling agent can re-list toolsets and try again.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    Arguments, Result, ServerCtx,
    group::{Activation, ToolsetGroup},
    schema::{CallToolResult, Tool},
    tool::ServerTool,
    toolset::Toolset,
};

/// Id of the discovery toolset.
pub const DYNAMIC_TOOLSET_ID: &str = "dynamic";

/// Parameters naming one toolset.
#[derive(Debug, Deserialize, JsonSchema)]
struct ToolsetParams {
    /// The id of the toolset, as returned by list_available_toolsets
    toolset: String,
}

/// One tool as described by `get_toolset_tools`.
#[derive(Debug, Serialize)]
struct ToolSummary<'a> {
    name: &'a str,
    description: &'a str,
    read_only: bool,
}

/// Build the always-enabled discovery toolset over a group.
pub fn dynamic_toolset(group: Arc<ToolsetGroup>) -> Toolset {
    Toolset::new(
        DYNAMIC_TOOLSET_ID,
        "Discover tools that can help achieve tasks by enabling additional sets of tools",
    )
    .add_read_tools([
        list_available_toolsets(group.clone()),
        get_toolset_tools(group.clone()),
        enable_toolset(group),
    ])
    .with_enabled(true)
}

/// `list_available_toolsets`: every toolset with live state and tool counts.
pub fn list_available_toolsets(group: Arc<ToolsetGroup>) -> ServerTool {
    let tool = Tool::new("list_available_toolsets", Default::default())
        .with_description(
            "List available toolsets this server offers, whether each is currently enabled, \
             and how many read and write tools it holds",
        )
        .with_annotation_title("List available toolsets")
        .with_read_only_hint(true);
    ServerTool::new(tool, move |_ctx: &ServerCtx, _args: Arguments| {
        let group = group.clone();
        Box::pin(async move { json_result(&group.list_toolsets()) })
    })
}

/// `get_toolset_tools`: preview a toolset's tools without enabling it.
pub fn get_toolset_tools(group: Arc<ToolsetGroup>) -> ServerTool {
    let tool = Tool::from_schema::<ToolsetParams>("get_toolset_tools")
        .with_description(
            "Lists all the capabilities that are enabled with the specified toolset, \
             use this to get clarity on whether enabling a toolset would help you to complete a task",
        )
        .with_annotation_title("List all tools in a toolset")
        .with_read_only_hint(true);
    ServerTool::new(tool, move |_ctx: &ServerCtx, args: Arguments| {
        let group = group.clone();
        Box::pin(async move {
            let params: ToolsetParams = match args.deserialize() {
                Ok(params) => params,
                Err(err) => return Ok(err.into_tool_result()),
            };
            let toolset = match group.find_toolset(&params.toolset) {
                Ok(toolset) => toolset,
                Err(err) => return Ok(err.into_tool_result()),
            };
            let tools: Vec<_> = toolset
                .available_tools(group.read_only())
                .into_iter()
                .map(|tool| ToolSummary {
                    name: tool.name(),
                    description: tool.description(),
                    read_only: tool.is_read_only(),
                })
                .collect();
            json_result(&json!({
                "toolset": toolset.id(),
                "enabled": toolset.is_enabled(),
                "tools": tools,
            }))
        })
    })
}

/// `enable_toolset`: enable a toolset and publish its tools on the session.
pub fn enable_toolset(group: Arc<ToolsetGroup>) -> ServerTool {
    let tool = Tool::from_schema::<ToolsetParams>("enable_toolset")
        .with_description("Enable one of the sets of tools this server provides")
        .with_annotation_title("Enable a toolset")
        .with_read_only_hint(true);
    ServerTool::new(tool, move |ctx: &ServerCtx, args: Arguments| {
        let group = group.clone();
        Box::pin(async move {
            let params: ToolsetParams = match args.deserialize() {
                Ok(params) => params,
                Err(err) => return Ok(err.into_tool_result()),
            };
            let id = params.toolset;
            match group.enable_toolset(&id, ctx.session()).await {
                Ok(Activation::Enabled { tools }) => Ok(CallToolResult::new()
                    .with_text_content(format!(
                        "Toolset {id} is now enabled. Newly available tools: {}",
                        tools.join(", ")
                    ))
                    .with_structured_content(json!({
                        "toolset": id,
                        "already_enabled": false,
                        "tools": tools,
                    }))),
                Ok(Activation::AlreadyEnabled) => Ok(CallToolResult::new()
                    .with_text_content(format!("Toolset {id} is already enabled"))
                    .with_structured_content(json!({
                        "toolset": id,
                        "already_enabled": true,
                        "tools": [],
                    }))),
                Err(err) => Ok(err.into_tool_result()),
            }
        })
    })
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult> {
    Ok(CallToolResult::new().with_json(value)?)
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::{schema::ToolSchema, testutils::TestSession};

    fn group() -> Arc<ToolsetGroup> {
        let noop = |name: &str, read_only: bool| {
            ServerTool::new(
                Tool::new(name, ToolSchema::empty()).with_read_only_hint(read_only),
                |_, _| Box::pin(async { Ok(CallToolResult::new()) }),
            )
        };
        let mut group = ToolsetGroup::new(true);
        group
            .add_toolset(
                Toolset::new("gists", "Gists")
                    .add_read_tools([noop("list_gists", true)])
                    .add_write_tools([noop("create_gist", false)]),
            )
            .unwrap();
        Arc::new(group)
    }

    #[tokio::test]
    async fn test_get_toolset_tools_honors_read_only() {
        let session = TestSession::new();
        let tool = get_toolset_tools(group());
        let result = tool
            .call(session.ctx(), Arguments::new().set("toolset", "gists"))
            .await
            .unwrap();
        let body: Value = result.json().unwrap();
        assert_eq!(body["tools"].as_array().unwrap().len(), 1);
        assert_eq!(body["tools"][0]["name"], "list_gists");
        assert_eq!(body["enabled"], false);
    }

    #[tokio::test]
    async fn test_missing_parameter_is_tool_error() {
        let session = TestSession::new();
        let result = enable_toolset(group())
            .call(session.ctx(), Arguments::new())
            .await
            .unwrap();
        assert!(result.is_error());
    }

    #[tokio::test]
    async fn test_enable_self_is_policy_violation() {
        let session = TestSession::new();
        let result = enable_toolset(group())
            .call(session.ctx(), Arguments::new().set("toolset", DYNAMIC_TOOLSET_ID))
            .await
            .unwrap();
        assert!(result.is_error());
        assert!(result.text().unwrap().contains("Policy violation"));
    }

    #[test]
    fn test_dynamic_toolset_is_always_enabled() {
        let toolset = dynamic_toolset(group());
        assert!(toolset.is_enabled());
        assert_eq!(toolset.read_tools().len(), 3);
        assert!(toolset.write_tools().is_empty());
    }
}
