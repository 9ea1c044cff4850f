//! JSON-RPC protocol tests against a served connection.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use forgemcp::{
        Connection, ServerOptions, ServerPrompt, ServerTool, Toolset, ToolsetGroup,
        schema::{
            CallToolResult, INVALID_REQUEST, JSONRPCMessage, METHOD_NOT_FOUND, PARSE_ERROR, Prompt,
            PromptArgument, Role, Tool, ToolSchema,
        },
        testutils::{TestClient, connected_client},
    };
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn tool(name: &str, read_only: bool) -> ServerTool {
        ServerTool::new(
            Tool::new(name, ToolSchema::empty())
                .with_description(format!("Run {name}"))
                .with_read_only_hint(read_only),
            |_, args| {
                Box::pin(async move {
                    let owner = args.required_str("owner")?;
                    Ok(CallToolResult::new().with_text_content(format!("owner={owner}")))
                })
            },
        )
    }

    fn group(read_only: bool) -> ToolsetGroup {
        let mut group = ToolsetGroup::new(read_only);
        group
            .add_toolset(
                Toolset::new("issues", "Issues")
                    .add_read_tools([tool("get_issue", true)])
                    .add_write_tools([tool("create_issue", false)])
                    .add_prompts([ServerPrompt::new(
                        Prompt::new("IssueToFixWorkflow")
                            .with_description("Turn an issue into a fix")
                            .with_argument(PromptArgument::new("issue", "Issue number", true)),
                    )
                    .with_message(Role::User, "Fix issue #{issue}.")]),
            )
            .unwrap();
        group
            .add_toolset(
                Toolset::new("repos", "Repositories")
                    .add_read_tools([tool("list_branches", true)])
                    .add_write_tools([tool("create_branch", false)])
                    .with_enabled(true),
            )
            .unwrap();
        group
    }

    async fn client(read_only: bool, options: ServerOptions) -> TestClient {
        let _ = tracing_subscriber::fmt::try_init();
        let (client, _handle) = connected_client(move || {
            Connection::new(Arc::new(group(read_only)), options.clone())
        })
        .unwrap();
        client
    }

    fn dynamic() -> ServerOptions {
        ServerOptions {
            dynamic_toolsets: true,
            ..ServerOptions::default()
        }
    }

    fn tool_names(result: &Value) -> Vec<String> {
        result["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|tool| tool["name"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_initialize() {
        let mut client = client(false, ServerOptions::default()).await;
        let result = client
            .call(
                "initialize",
                Some(json!({
                    "protocolVersion": "2025-06-18",
                    "capabilities": {},
                    "clientInfo": {"name": "test-client", "version": "1.0"}
                })),
            )
            .await
            .unwrap();
        assert_eq!(result["capabilities"]["tools"]["listChanged"], true);
        assert_eq!(result["serverInfo"]["name"], "forgemcp");
        let instructions = result["instructions"].as_str().unwrap();
        assert!(instructions.contains("forge"));
    }

    #[tokio::test]
    async fn test_disabled_instructions_are_omitted() {
        let options = ServerOptions {
            disable_instructions: true,
            ..ServerOptions::default()
        };
        let mut client = client(false, options).await;
        let result = client.call("initialize", None).await.unwrap();
        assert!(result.get("instructions").is_none());
    }

    #[tokio::test]
    async fn test_tools_list_respects_enabled_state() {
        let mut client = client(false, ServerOptions::default()).await;
        let result = client.call("tools/list", None).await.unwrap();
        assert_eq!(tool_names(&result), vec!["create_branch", "list_branches"]);
    }

    #[tokio::test]
    async fn test_read_only_hides_write_tools() {
        let mut client = client(true, ServerOptions::default()).await;
        let result = client.call("tools/list", None).await.unwrap();
        assert_eq!(tool_names(&result), vec!["list_branches"]);

        let result = client
            .call(
                "tools/call",
                Some(json!({"name": "create_branch", "arguments": {"owner": "o"}})),
            )
            .await
            .unwrap();
        assert_eq!(result["isError"], true);
    }

    #[tokio::test]
    async fn test_enable_toolset_over_the_wire() {
        let mut client = client(false, dynamic()).await;
        let before = client.call("tools/list", None).await.unwrap();
        assert!(!tool_names(&before).contains(&"get_issue".to_string()));
        assert!(tool_names(&before).contains(&"enable_toolset".to_string()));

        let result = client
            .call(
                "tools/call",
                Some(json!({"name": "enable_toolset", "arguments": {"toolset": "issues"}})),
            )
            .await
            .unwrap();
        assert!(result.get("isError").is_none());
        assert_eq!(
            result["structuredContent"]["tools"],
            json!(["get_issue", "create_issue"])
        );

        let notifications = client.take_notifications().await;
        let methods: Vec<_> = notifications.iter().map(|n| n.method.as_str()).collect();
        assert_eq!(
            methods,
            vec![
                "notifications/tools/list_changed",
                "notifications/prompts/list_changed",
            ]
        );

        let after = client.call("tools/list", None).await.unwrap();
        let names = tool_names(&after);
        assert!(names.contains(&"get_issue".to_string()));
        assert!(names.contains(&"create_issue".to_string()));

        let called = client
            .call(
                "tools/call",
                Some(json!({"name": "get_issue", "arguments": {"owner": "octo"}})),
            )
            .await
            .unwrap();
        assert_eq!(called["content"][0]["text"], "owner=octo");

        let prompts = client.call("prompts/list", None).await.unwrap();
        assert_eq!(prompts["prompts"][0]["name"], "IssueToFixWorkflow");
    }

    #[tokio::test]
    async fn test_list_changed_precedes_enable_response() {
        let enable = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {"name": "enable_toolset", "arguments": {"toolset": "issues"}},
        })
        .to_string();
        for _ in 0..50 {
            let mut client = client(false, dynamic()).await;
            client.send_line(&enable).await.unwrap();
            let mut methods = Vec::new();
            loop {
                match client.next_message().await.unwrap() {
                    JSONRPCMessage::Notification(notification) => {
                        methods.push(notification.method)
                    }
                    JSONRPCMessage::Response(response) => {
                        assert_eq!(response.result["structuredContent"]["toolset"], "issues");
                        break;
                    }
                    other => panic!("unexpected message: {other:?}"),
                }
            }
            assert_eq!(
                methods,
                vec![
                    "notifications/tools/list_changed",
                    "notifications/prompts/list_changed",
                ]
            );
        }
    }

    #[tokio::test]
    async fn test_oversized_line_closes_connection() {
        let options = ServerOptions {
            max_message_bytes: 128,
            ..ServerOptions::default()
        };
        let mut client = client(false, options).await;
        client.send_line(&"x".repeat(512)).await.unwrap();
        match client.next_message().await.unwrap() {
            JSONRPCMessage::Error(error) => {
                assert_eq!(error.error.code, INVALID_REQUEST);
                assert!(error.id.is_none());
            }
            other => panic!("expected an error, got {other:?}"),
        }
        assert!(client.next_message().await.is_err());
    }

    #[tokio::test]
    async fn test_resources_list_is_empty() {
        let mut client = client(false, ServerOptions::default()).await;
        let listed = client.call("resources/list", None).await.unwrap();
        assert_eq!(listed, json!({"resources": []}));
    }

    #[tokio::test]
    async fn test_each_connection_has_its_own_state() {
        let mut first = client(false, dynamic()).await;
        let mut second = client(false, dynamic()).await;
        first
            .call(
                "tools/call",
                Some(json!({"name": "enable_toolset", "arguments": {"toolset": "issues"}})),
            )
            .await
            .unwrap();
        let listed = second.call("tools/list", None).await.unwrap();
        assert!(!tool_names(&listed).contains(&"get_issue".to_string()));
    }

    #[tokio::test]
    async fn test_missing_argument_is_a_tool_error() {
        let mut client = client(false, ServerOptions::default()).await;
        let result = client
            .call(
                "tools/call",
                Some(json!({"name": "list_branches", "arguments": {}})),
            )
            .await
            .unwrap();
        assert_eq!(result["isError"], true);
        assert!(
            result["content"][0]["text"]
                .as_str()
                .unwrap()
                .contains("missing required parameter: owner")
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_and_method() {
        let mut client = client(false, ServerOptions::default()).await;
        let message = client
            .request("tools/call", Some(json!({"name": "nope"})))
            .await
            .unwrap();
        assert!(matches!(message, JSONRPCMessage::Error(e) if e.error.code == METHOD_NOT_FOUND));

        let message = client.request("resources/read", None).await.unwrap();
        assert!(matches!(message, JSONRPCMessage::Error(e) if e.error.code == METHOD_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_parse_error() {
        let mut client = client(false, ServerOptions::default()).await;
        client.send_line("{not json").await.unwrap();
        let message = client.next_message().await.unwrap();
        let JSONRPCMessage::Error(error) = message else {
            panic!("expected error, got {message:?}");
        };
        assert_eq!(error.error.code, PARSE_ERROR);
        assert_eq!(error.id, None);

        let pong = client.call("ping", None).await.unwrap();
        assert_eq!(pong, json!({}));
    }

    #[tokio::test]
    async fn test_prompt_rendering() {
        let mut client = client(false, dynamic()).await;
        client
            .call(
                "tools/call",
                Some(json!({"name": "enable_toolset", "arguments": {"toolset": "issues"}})),
            )
            .await
            .unwrap();
        let result = client
            .call(
                "prompts/get",
                Some(json!({"name": "IssueToFixWorkflow", "arguments": {"issue": "42"}})),
            )
            .await
            .unwrap();
        assert_eq!(result["messages"][0]["role"], "user");
        assert_eq!(result["messages"][0]["content"]["text"], "Fix issue #42.");

        let message = client
            .request("prompts/get", Some(json!({"name": "IssueToFixWorkflow"})))
            .await
            .unwrap();
        assert!(matches!(message, JSONRPCMessage::Error(_)));
    }
}
