//! End-to-end tests of the forge catalogue served over in-memory streams.

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use clap::Parser;
    use forgemcp::{
        Error,
        schema::{JSONRPCMessage, METHOD_NOT_FOUND},
        testutils::{TestClient, connected_client},
    };
    use forgemcp_server::config::{Cli, Command, Config};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn config(args: &[&str], fixtures: Option<&Path>) -> Config {
        let mut argv = vec!["forgemcp", "stdio"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();
        let Command::Stdio(args) = cli.command else {
            panic!("expected stdio");
        };
        let mut config = args.resolve().unwrap();
        config.fixtures = fixtures.map(Path::to_path_buf);
        config
    }

    fn client(config: Config) -> TestClient {
        let _ = tracing_subscriber::fmt::try_init();
        let backend = config.backend();
        let (client, _handle) = connected_client(move || config.connection(backend.clone())).unwrap();
        client
    }

    fn names(result: &Value) -> Vec<String> {
        result["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|tool| tool["name"].as_str().unwrap().to_string())
            .collect()
    }

    async fn call_tool(client: &mut TestClient, name: &str, arguments: Value) -> Value {
        client
            .call("tools/call", Some(json!({"name": name, "arguments": arguments})))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_fixture_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("get_me.json"),
            r#"{"login": "octocat", "id": 1}"#,
        )
        .unwrap();
        let mut client = client(config(&[], Some(dir.path())));

        let result = call_tool(&mut client, "get_me", json!({})).await;
        assert!(result.get("isError").is_none());
        assert_eq!(result["structuredContent"]["login"], "octocat");

        let result = call_tool(
            &mut client,
            "list_branches",
            json!({"owner": "o", "repo": "r"}),
        )
        .await;
        assert_eq!(result["isError"], true);
        assert!(
            result["content"][0]["text"]
                .as_str()
                .unwrap()
                .contains("no fixture recorded")
        );
    }

    #[tokio::test]
    async fn test_detached_backend() {
        let mut client = client(config(&[], None));
        let result = call_tool(&mut client, "get_me", json!({})).await;
        assert_eq!(result["isError"], true);
    }

    #[tokio::test]
    async fn test_default_toolsets_and_read_only() {
        let mut client = client(config(&["--read-only"], None));
        let listed = names(&client.call("tools/list", None).await.unwrap());
        assert!(listed.contains(&"get_me".to_string()));
        assert!(listed.contains(&"get_pull_request".to_string()));
        assert!(!listed.contains(&"create_branch".to_string()));
        assert!(!listed.contains(&"get_issue".to_string()));

        let templates = client.call("resources/templates/list", None).await.unwrap();
        assert_eq!(templates["resourceTemplates"].as_array().unwrap().len(), 5);

        let result = call_tool(
            &mut client,
            "create_branch",
            json!({"owner": "o", "repo": "r", "branch": "b"}),
        )
        .await;
        assert_eq!(result["isError"], true);
    }

    #[tokio::test]
    async fn test_individual_tools() {
        let mut client = client(config(&["--toolsets", "context", "--tools", "get_issue"], None));
        let listed = names(&client.call("tools/list", None).await.unwrap());
        assert_eq!(
            listed,
            vec!["get_issue", "get_me", "get_team_members", "get_teams"]
        );
    }

    #[tokio::test]
    async fn test_dynamic_discovery_over_stdio() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("download_job_logs.json"),
            serde_json::to_string(&Value::String(
                (1..=50).map(|n| format!("step {n}\n")).collect(),
            ))
            .unwrap(),
        )
        .unwrap();
        let mut client = client(config(
            &["--dynamic-toolsets", "--toolsets", "all", "--content-window-size", "5"],
            Some(dir.path()),
        ));

        let init = client.call("initialize", None).await.unwrap();
        let instructions = init["instructions"].as_str().unwrap();
        assert!(!instructions.contains("## Actions"));

        let listed = names(&client.call("tools/list", None).await.unwrap());
        assert_eq!(
            listed,
            vec!["enable_toolset", "get_toolset_tools", "list_available_toolsets"]
        );

        let enabled = call_tool(&mut client, "enable_toolset", json!({"toolset": "actions"})).await;
        assert!(enabled.get("isError").is_none());
        let notifications = client.take_notifications().await;
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].method, "notifications/tools/list_changed");

        let logs = call_tool(
            &mut client,
            "get_job_logs",
            json!({"owner": "o", "repo": "r", "job_id": 9, "tail_lines": 100}),
        )
        .await;
        assert_eq!(logs["structuredContent"]["truncation"]["kept_lines"], 5);
        let text = logs["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("step 50\n"));
        assert!(!text.contains("step 45\n"));

        let again = call_tool(&mut client, "enable_toolset", json!({"toolset": "actions"})).await;
        assert_eq!(again["structuredContent"]["already_enabled"], true);
        assert!(client.take_notifications().await.is_empty());
    }

    #[tokio::test]
    async fn test_configuration_errors_are_fatal() {
        let unknown = config(&["--toolsets", "nope"], None);
        let err = connected_client(move || unknown.connection(unknown.backend()))
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidConfiguration(_)));

        let hidden = config(&["--read-only", "--tools", "create_issue"], None);
        assert!(matches!(
            hidden.connection(hidden.backend()),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_method_after_configuration() {
        let mut client = client(config(&[], None));
        let message = client.request("completion/complete", None).await.unwrap();
        assert!(matches!(message, JSONRPCMessage::Error(e) if e.error.code == METHOD_NOT_FOUND));
    }
}
