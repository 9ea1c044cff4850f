use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{broadcast::error::RecvError, mpsc},
    task::JoinHandle,
};
use tokio_util::{
    codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError},
    sync::CancellationToken,
};
use tracing::{debug, error, info, warn};

use crate::{
    Arguments, Error, Result, ServerCtx,
    dynamic::dynamic_toolset,
    group::ToolsetGroup,
    instructions::generate_instructions,
    jsonrpc::{create_jsonrpc_error, result_to_jsonrpc_response},
    schema::*,
    session::{Session, ToolSink},
};

/// Longest inbound line accepted unless configured otherwise.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 4 * 1024 * 1024;

/// Options that shape what a connection serves.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Server name reported on initialize.
    pub name: String,
    /// Server version reported on initialize.
    pub version: String,
    /// Expose the discovery toolset.
    pub dynamic_toolsets: bool,
    /// Tools exposed individually, regardless of toolset state.
    pub tools: Vec<String>,
    /// Suppress synthesized instructions.
    pub disable_instructions: bool,
    /// Longest inbound JSON-RPC line; a longer line closes the connection.
    pub max_message_bytes: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            dynamic_toolsets: false,
            tools: Vec::new(),
            disable_instructions: false,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

/// Parameters of a prompts/get request.
#[derive(Debug, Deserialize)]
struct GetPromptParams {
    name: String,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

/// State of one client connection: its toolset group and session.
pub struct Connection {
    /// Registry backing this connection.
    group: Arc<ToolsetGroup>,
    /// Tools, templates and prompts the client can see.
    session: Session,
    /// Serving options.
    options: ServerOptions,
}

impl Connection {
    /// Build a connection and publish everything initially visible.
    ///
    /// Enabled toolsets, individually selected tools and, when requested, the
    /// discovery toolset are registered on a fresh session.
    pub fn new(group: Arc<ToolsetGroup>, options: ServerOptions) -> Result<Self> {
        let session = Session::new();
        let mut count = group.register_enabled(&session)?;
        for tool in group.select_tools(options.tools.as_slice())? {
            session.register_tool(tool)?;
            count += 1;
        }
        if options.dynamic_toolsets {
            for tool in dynamic_toolset(group.clone()).read_tools() {
                session.register_tool(tool.clone())?;
                count += 1;
            }
        }
        debug!(tools = count, "connection ready");
        Ok(Self {
            group,
            session,
            options,
        })
    }

    /// The connection's session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The connection's toolset group.
    pub fn group(&self) -> &Arc<ToolsetGroup> {
        &self.group
    }

    /// Build the initialize response.
    pub fn initialize(&self) -> InitializeResult {
        let enabled = self.group.enabled_ids();
        let instructions =
            generate_instructions(enabled.as_slice(), self.options.disable_instructions);
        InitializeResult::new(&self.options.name)
            .with_version(&self.options.version)
            .with_tools(true)
            .with_prompts(true)
            .with_resources(false, true)
            .with_instructions(instructions)
    }

    /// Call a tool visible on this session.
    ///
    /// A write tool hidden by the read-only policy yields a policy-violation
    /// tool result; a name that is not registered anywhere is `ToolNotFound`.
    /// Handler failures are reported as tool results with `isError` set.
    pub async fn call_tool(
        &self,
        ctx: &ServerCtx,
        name: &str,
        arguments: Arguments,
    ) -> Result<CallToolResult> {
        if !self.session.has_tool(name) {
            if let Some((_, tool)) = self.group.find_tool(name)
                && self.group.read_only()
                && !tool.is_read_only()
            {
                return Ok(Error::PolicyViolation(format!(
                    "tool '{name}' modifies remote state and the server is read-only"
                ))
                .into_tool_result());
            }
            return Err(Error::ToolNotFound(name.to_string()));
        }
        match self.session.call_tool(ctx, name, arguments).await {
            Ok(result) => Ok(result),
            Err(Error::ToolNotFound(name)) => Err(Error::ToolNotFound(name)),
            Err(err) => {
                warn!(tool = name, error = %err, "tool call failed");
                Ok(err.into_tool_result())
            }
        }
    }

    /// Dispatch one request.
    async fn handle_request(&self, ctx: &ServerCtx, request: JSONRPCRequest) -> JSONRPCMessage {
        debug!(id = %request.id, method = %request.method, "handling request");
        let ctx = ctx.with_request_id(request.id.clone());
        let id = request.id.clone();
        let result = self.dispatch(&ctx, request).await;
        result_to_jsonrpc_response(id, result)
    }

    /// Route a request to its method.
    async fn dispatch(&self, ctx: &ServerCtx, request: JSONRPCRequest) -> Result<Value> {
        let JSONRPCRequest { method, params, .. } = request;
        match method.as_str() {
            "initialize" => {
                if let Some(params) = params {
                    let params: InitializeParams = parse_params(&method, params)?;
                    info!(
                        client = %params.client_info.name,
                        protocol = %params.protocol_version,
                        "client initializing"
                    );
                }
                serialize(self.initialize())
            }
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => serialize(self.session.list_tools()),
            "tools/call" => {
                let params: CallToolParams =
                    parse_params(&method, params.unwrap_or(Value::Null))?;
                let arguments = Arguments::from(params.arguments.unwrap_or_default());
                serialize(self.call_tool(ctx, &params.name, arguments).await?)
            }
            // Only templates are published, so there is nothing concrete to
            // list or read.
            "resources/list" => serialize(ListResourcesResult::default()),
            "resources/read" => {
                let params: ReadResourceParams =
                    parse_params(&method, params.unwrap_or(Value::Null))?;
                Err(Error::ResourceNotFound(params.uri))
            }
            "resources/templates/list" => serialize(self.session.list_resource_templates()),
            "prompts/list" => serialize(self.session.list_prompts()),
            "prompts/get" => {
                let params: GetPromptParams =
                    parse_params(&method, params.unwrap_or(Value::Null))?;
                let arguments = Arguments::from(params.arguments.unwrap_or_default());
                serialize(self.session.get_prompt(&params.name, &arguments)?)
            }
            _ => Err(Error::MethodNotFound(method.clone())),
        }
    }
}

/// Deserialize request params, reporting failures as invalid params.
fn parse_params<T: for<'de> Deserialize<'de>>(method: &str, params: Value) -> Result<T> {
    serde_json::from_value(params)
        .map_err(|err| Error::InvalidParams(format!("Invalid parameters for {method}: {err}")))
}

/// Serialize a handler result into JSON for a JSON-RPC response.
fn serialize<T: Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value).map_err(Into::into)
}

/// MCP server speaking newline-delimited JSON-RPC.
pub struct Server<F> {
    /// Factory for creating per-connection state.
    connection_factory: F,
}

impl<F> Server<F>
where
    F: Fn() -> Result<Connection> + Send + Sync + 'static,
{
    /// Create a server with a connection factory.
    ///
    /// The factory is called once for each connection, so every connection
    /// gets its own toolset group and activation state.
    pub fn new(factory: F) -> Self {
        Self {
            connection_factory: factory,
        }
    }

    /// Serve a single connection on stdin/stdout until the client disconnects.
    pub async fn serve_stdio(self) -> Result<()> {
        self.serve_stream(tokio::io::stdin(), tokio::io::stdout())
            .await
    }

    /// Serve a single connection on the given streams until the client disconnects.
    pub async fn serve_stream<R, W>(self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let handle = ServerHandle::from_stream(self, reader, writer)?;
        handle
            .handle
            .await
            .map_err(|e| Error::InternalError(format!("Server task failed: {e}")))
    }
}

/// Handle to a connection served in the background.
pub struct ServerHandle {
    /// Serving task.
    handle: JoinHandle<()>,
    /// Stops the serving loop.
    shutdown_token: CancellationToken,
}

impl ServerHandle {
    /// Start serving a connection on the given streams.
    pub fn from_stream<F, R, W>(server: Server<F>, reader: R, writer: W) -> Result<Self>
    where
        F: Fn() -> Result<Connection> + Send + Sync + 'static,
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let connection = Arc::new((server.connection_factory)()?);
        let ctx = ServerCtx::new(connection.session().clone());
        let mut notification_rx = connection.session().subscribe();
        let max_message_bytes = connection.options.max_message_bytes;
        let mut stream_rx =
            FramedRead::new(reader, LinesCodec::new_with_max_length(max_message_bytes));
        let mut sink_tx = FramedWrite::new(writer, LinesCodec::new());
        let (response_tx, mut response_rx) = mpsc::unbounded_channel::<JSONRPCMessage>();

        let shutdown_token = CancellationToken::new();
        let shutdown_token_task = shutdown_token.clone();

        info!("MCP server started");
        let handle = tokio::spawn(async move {
            loop {
                // Branch order is significant. An activation broadcasts
                // before its response is queued, so list_changed goes first.
                tokio::select! {
                    biased;

                    _ = shutdown_token_task.cancelled() => {
                        info!("Server received shutdown signal");
                        break;
                    }
                    notification = notification_rx.recv() => {
                        match notification {
                            Ok(notification) => {
                                let message = JSONRPCMessage::Notification(notification.to_jsonrpc());
                                if let Err(e) = send_message(&mut sink_tx, &message).await {
                                    error!("Error sending notification to client: {}", e);
                                    break;
                                }
                            }
                            Err(RecvError::Lagged(skipped)) => {
                                warn!(skipped, "notification receiver lagged");
                            }
                            Err(RecvError::Closed) => break,
                        }
                    }
                    Some(response) = response_rx.recv() => {
                        if let Err(e) = send_message(&mut sink_tx, &response).await {
                            error!("Error sending response to client: {}", e);
                            break;
                        }
                    }
                    result = stream_rx.next() => {
                        match result {
                            Some(Ok(line)) => {
                                if line.trim().is_empty() {
                                    continue;
                                }
                                match serde_json::from_str::<JSONRPCMessage>(&line) {
                                    Ok(JSONRPCMessage::Request(request)) => {
                                        let connection = connection.clone();
                                        let ctx = ctx.clone();
                                        let tx = response_tx.clone();
                                        tokio::spawn(async move {
                                            let response = connection.handle_request(&ctx, request).await;
                                            if let Err(e) = tx.send(response) {
                                                error!("Failed to queue response: {}", e);
                                            }
                                        });
                                    }
                                    Ok(JSONRPCMessage::Notification(notification)) => {
                                        debug!("Received notification: {}", notification.method);
                                    }
                                    Ok(_) => debug!("Ignoring response from client"),
                                    Err(e) => {
                                        warn!("Failed to parse message: {}", e);
                                        let response = create_jsonrpc_error(
                                            None,
                                            PARSE_ERROR,
                                            format!("Parse error: {e}"),
                                            None,
                                        );
                                        if let Err(e) = send_message(&mut sink_tx, &response).await {
                                            error!("Error sending response to client: {}", e);
                                            break;
                                        }
                                    }
                                }
                            }
                            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                                // The framed reader ends after a decode error.
                                warn!(max_message_bytes, "closing connection on oversized message");
                                let response = create_jsonrpc_error(
                                    None,
                                    INVALID_REQUEST,
                                    format!("Message exceeds {max_message_bytes} bytes"),
                                    None,
                                );
                                if let Err(e) = send_message(&mut sink_tx, &response).await {
                                    error!("Error sending response to client: {}", e);
                                }
                                break;
                            }
                            Some(Err(e)) => {
                                error!("Error reading message: {}", e);
                                break;
                            }
                            None => {
                                info!("Client disconnected");
                                break;
                            }
                        }
                    }
                }
            }
            info!("MCP server stopped");
        });

        Ok(Self {
            handle,
            shutdown_token,
        })
    }

    /// Stop serving and wait for the loop to exit.
    pub async fn stop(self) -> Result<()> {
        self.shutdown_token.cancel();
        self.handle
            .await
            .map_err(|e| Error::InternalError(format!("Server task failed: {e}")))
    }
}

/// Encode and write one message as a line.
async fn send_message<W>(sink: &mut FramedWrite<W, LinesCodec>, message: &JSONRPCMessage) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let line = serde_json::to_string(message)?;
    sink.send(line)
        .await
        .map_err(|e| Error::Transport(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        schema::{Tool, ToolSchema},
        tool::ServerTool,
        toolset::Toolset,
    };

    fn connection(read_only: bool) -> Connection {
        let noop = |name: &str, read_only: bool| {
            ServerTool::new(
                Tool::new(name, ToolSchema::empty()).with_read_only_hint(read_only),
                |_, _| Box::pin(async { Ok(CallToolResult::new().with_text_content("ok")) }),
            )
        };
        let mut group = ToolsetGroup::new(read_only);
        group
            .add_toolset(
                Toolset::new("gists", "Gists")
                    .add_read_tools([noop("list_gists", true)])
                    .add_write_tools([noop("create_gist", false)])
                    .with_enabled(true),
            )
            .unwrap();
        Connection::new(Arc::new(group), ServerOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn test_read_only_write_call_is_policy_violation() {
        let connection = connection(true);
        let ctx = ServerCtx::new(connection.session().clone());
        let result = connection
            .call_tool(&ctx, "create_gist", Arguments::new())
            .await
            .unwrap();
        assert!(result.is_error());
        assert!(result.text().unwrap().contains("read-only"));

        let err = connection
            .call_tool(&ctx, "nope", Arguments::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let connection = connection(false);
        let ctx = ServerCtx::new(connection.session().clone());
        let response = connection
            .handle_request(
                &ctx,
                JSONRPCRequest::new(RequestId::Number(1), "logging/setLevel", None),
            )
            .await;
        assert!(matches!(response, JSONRPCMessage::Error(e) if e.error.code == METHOD_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_advertised_resource_methods_are_served() {
        let connection = connection(false);
        let ctx = ServerCtx::new(connection.session().clone());

        let listed = connection
            .handle_request(
                &ctx,
                JSONRPCRequest::new(RequestId::Number(1), "resources/list", None),
            )
            .await;
        let JSONRPCMessage::Response(listed) = listed else {
            panic!("expected a response, got {listed:?}");
        };
        assert_eq!(listed.result, serde_json::json!({"resources": []}));

        let read = connection
            .handle_request(
                &ctx,
                JSONRPCRequest::new(
                    RequestId::Number(2),
                    "resources/read",
                    Some(serde_json::json!({"uri": "repo://octo/hello/contents/README.md"})),
                ),
            )
            .await;
        assert!(matches!(read, JSONRPCMessage::Error(e) if e.error.code == RESOURCE_NOT_FOUND));
    }

    #[test]
    fn test_initialize_advertises_list_changed() {
        let result = connection(false).initialize();
        let capabilities = result.capabilities;
        assert_eq!(capabilities.tools.unwrap().list_changed, Some(true));
        assert_eq!(capabilities.prompts.unwrap().list_changed, Some(true));
        assert_eq!(capabilities.resources.unwrap().list_changed, Some(true));
        assert!(capabilities.logging.is_none());
        assert!(result.instructions.unwrap().contains("forge"));
    }
}
