//! Dynamic discovery integration tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use forgemcp::{
        Activation, Arguments, Error, ServerCtx, ServerTool, ToolFuture, Toolset, ToolsetGroup,
        dynamic::{self, DYNAMIC_TOOLSET_ID},
        schema::{CallToolResult, ServerNotification, Tool, ToolSchema},
        testutils::TestSession,
    };
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    fn ok_handler<'a>(
        _ctx: &'a ServerCtx,
        _args: Arguments,
    ) -> ToolFuture<'a, forgemcp::Result<CallToolResult>> {
        Box::pin(async { Ok(CallToolResult::new()) })
    }

    fn read(name: &str) -> ServerTool {
        ServerTool::new(
            Tool::new(name, ToolSchema::empty())
                .with_description(format!("{name} description"))
                .with_read_only_hint(true),
            ok_handler,
        )
    }

    fn write(name: &str) -> ServerTool {
        ServerTool::new(
            Tool::new(name, ToolSchema::empty()).with_description(format!("{name} description")),
            ok_handler,
        )
    }

    /// "issues" (3 read + 2 write, enabled) and "repos" (2 read + 1 write, disabled).
    fn scenario_group(read_only: bool) -> Arc<ToolsetGroup> {
        let mut group = ToolsetGroup::new(read_only);
        group
            .add_toolset(
                Toolset::new("issues", "Issues")
                    .add_read_tools([read("get_issue"), read("list_issues"), read("search_issues")])
                    .add_write_tools([write("create_issue"), write("update_issue")])
                    .with_enabled(true),
            )
            .unwrap();
        group
            .add_toolset(
                Toolset::new("repos", "Repositories")
                    .add_read_tools([read("list_branches"), read("get_commit")])
                    .add_write_tools([write("create_branch")]),
            )
            .unwrap();
        Arc::new(group)
    }

    async fn call(tool: &ServerTool, session: &TestSession, toolset: &str) -> CallToolResult {
        tool.call(session.ctx(), Arguments::new().set("toolset", toolset))
            .await
            .unwrap()
    }

    #[test]
    fn test_scenario_a_list_toolsets() {
        let group = scenario_group(false);
        let listed: Vec<_> = group
            .list_toolsets()
            .into_iter()
            .map(|info| (info.id, info.enabled, info.read_tools, info.write_tools))
            .collect();
        assert_eq!(
            listed,
            vec![
                ("issues".to_string(), true, 3, 2),
                ("repos".to_string(), false, 2, 1),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_available_toolsets_reflects_live_state() {
        let group = scenario_group(false);
        let session = TestSession::new();
        let list = dynamic::list_available_toolsets(group.clone());

        let before: Value = list
            .call(session.ctx(), Arguments::new())
            .await
            .unwrap()
            .json()
            .unwrap();
        assert_eq!(before[1]["id"], "repos");
        assert_eq!(before[1]["enabled"], false);

        group.enable_toolset("repos", session.session()).await.unwrap();

        let after: Value = list
            .call(session.ctx(), Arguments::new())
            .await
            .unwrap()
            .json()
            .unwrap();
        assert_eq!(after[1]["enabled"], true);
        assert_eq!(after[1]["read_tools"], 2);
        assert_eq!(after[1]["write_tools"], 1);
    }

    #[tokio::test]
    async fn test_scenario_b_preview_disabled_toolset() {
        let group = scenario_group(false);
        let session = TestSession::new();
        let result = call(&dynamic::get_toolset_tools(group.clone()), &session, "repos").await;
        assert!(!result.is_error());

        let body: Value = result.json().unwrap();
        let names: Vec<_> = body["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|tool| tool["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["list_branches", "get_commit", "create_branch"]);
        assert_eq!(body["tools"][2]["read_only"], false);
        assert!(!group.is_enabled("repos"));
        assert!(session.session().tool_names().is_empty());
    }

    #[tokio::test]
    async fn test_preview_honors_read_only_policy() {
        let group = scenario_group(true);
        let session = TestSession::new();
        let body: Value = call(&dynamic::get_toolset_tools(group), &session, "repos")
            .await
            .json()
            .unwrap();
        assert_eq!(body["tools"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_scenario_c_enable_then_noop() {
        let group = scenario_group(false);
        let mut session = TestSession::new();
        let enable = dynamic::enable_toolset(group.clone());

        let first = call(&enable, &session, "repos").await;
        assert!(!first.is_error());
        let structured = first.structured_content.clone().unwrap();
        assert_eq!(
            structured["tools"],
            serde_json::json!(["list_branches", "get_commit", "create_branch"])
        );
        assert!(first.text().unwrap().contains("create_branch"));
        assert!(group.is_enabled("repos"));
        assert_eq!(
            session.try_recv_notification().await,
            Some(ServerNotification::ToolListChanged)
        );
        assert!(session.session().has_tool("create_branch"));

        let second = call(&enable, &session, "repos").await;
        assert!(!second.is_error());
        assert_eq!(second.structured_content.unwrap()["already_enabled"], true);
        assert!(session.try_recv_notification().await.is_none());
    }

    #[tokio::test]
    async fn test_enable_under_read_only_skips_write_tools() {
        let group = scenario_group(true);
        let session = TestSession::new();
        let activation = group.enable_toolset("repos", session.session()).await.unwrap();
        assert_eq!(
            activation,
            Activation::Enabled {
                tools: vec!["list_branches".into(), "get_commit".into()]
            }
        );
        assert!(!session.session().has_tool("create_branch"));
    }

    #[tokio::test]
    async fn test_scenario_d_unknown_toolset() {
        let group = scenario_group(false);
        let mut session = TestSession::new();
        let before = group.list_toolsets();

        for tool in [
            dynamic::enable_toolset(group.clone()),
            dynamic::get_toolset_tools(group.clone()),
        ] {
            let result = call(&tool, &session, "nonexistent").await;
            assert!(result.is_error());
            let structured = result.structured_content.unwrap();
            assert_eq!(structured["error"], "toolset_not_found");
            assert_eq!(structured["toolset"], "nonexistent");
            assert_eq!(
                structured["available_toolsets"],
                serde_json::json!(["issues", "repos"])
            );
        }

        assert_eq!(group.list_toolsets(), before);
        assert!(session.session().tool_names().is_empty());
        assert!(session.try_recv_notification().await.is_none());
    }

    #[tokio::test]
    async fn test_discovery_toolset_cannot_be_targeted() {
        let group = scenario_group(false);
        let session = TestSession::new();
        for _ in 0..2 {
            let err = group
                .enable_toolset(DYNAMIC_TOOLSET_ID, session.session())
                .await
                .unwrap_err();
            assert!(matches!(err, Error::PolicyViolation(_)));
            assert!(err.is_recoverable());
        }
    }

    #[tokio::test]
    async fn test_concurrent_enable_registers_once() {
        let group = scenario_group(false);
        let mut session = TestSession::new();
        let sink = session.session().clone();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let group = group.clone();
                let sink = sink.clone();
                tokio::spawn(async move { group.enable_toolset("repos", &sink).await })
            })
            .collect();

        let mut enabled = 0;
        let mut noop = 0;
        for task in tasks {
            match task.await.unwrap().unwrap() {
                Activation::Enabled { tools } => {
                    assert_eq!(tools.len(), 3);
                    enabled += 1;
                }
                Activation::AlreadyEnabled => noop += 1,
            }
        }
        assert_eq!((enabled, noop), (1, 7));
        assert_eq!(
            session.try_recv_notification().await,
            Some(ServerNotification::ToolListChanged)
        );
        assert!(session.try_recv_notification().await.is_none());
    }

    #[test]
    fn test_tool_names_unique_across_group() {
        let mut group = ToolsetGroup::new(false);
        group
            .add_toolset(Toolset::new("issues", "Issues").add_write_tools([write("create_issue")]))
            .unwrap();
        let err = group
            .add_toolset(Toolset::new("triage", "Triage").add_write_tools([write("create_issue")]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
        assert!(!err.is_recoverable());
        assert_eq!(group.toolset_ids(), vec!["issues"]);
    }
}
