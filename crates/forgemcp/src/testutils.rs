//! Test utilities for `forgemcp`.
//!
//! Helpers for unit and integration tests: an in-memory [`TestSession`] that
//! records notifications, and a small line-oriented [`TestClient`] that drives
//! a served [`Connection`] over in-memory pipes.

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::{
    io::{self, DuplexStream},
    sync::broadcast,
    time::{Duration, timeout},
};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

use crate::{
    Error, Result, ServerCtx,
    schema::{JSONRPCMessage, JSONRPCNotification, JSONRPCRequest, RequestId, ServerNotification},
    server::{Connection, Server, ServerHandle},
    session::Session,
};

/// A session with a subscribed notification receiver.
pub struct TestSession {
    /// Context bound to the session.
    ctx: ServerCtx,
    /// Receiver for session notifications.
    notification_rx: broadcast::Receiver<ServerNotification>,
}

impl TestSession {
    /// Create a fresh session with a subscriber attached.
    pub fn new() -> Self {
        let session = Session::new();
        let notification_rx = session.subscribe();
        Self {
            ctx: ServerCtx::new(session),
            notification_rx,
        }
    }

    /// Get a reference to the ServerCtx
    pub fn ctx(&self) -> &ServerCtx {
        &self.ctx
    }

    /// Get a reference to the session
    pub fn session(&self) -> &Session {
        self.ctx.session()
    }

    /// Try to receive a notification, returning None if no notification is available
    pub async fn try_recv_notification(&mut self) -> Option<ServerNotification> {
        timeout(Duration::from_millis(10), self.notification_rx.recv())
            .await
            .ok()
            .and_then(|result| result.ok())
    }
}

impl Default for TestSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Minimal JSON-RPC client over newline-delimited streams.
pub struct TestClient {
    reader: FramedRead<DuplexStream, LinesCodec>,
    writer: FramedWrite<DuplexStream, LinesCodec>,
    next_id: i64,
    /// Notifications received while waiting for responses.
    notifications: Vec<JSONRPCNotification>,
}

impl TestClient {
    /// Send a raw line.
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        self.writer
            .send(line.to_string())
            .await
            .map_err(|e| Error::Transport(e.to_string()))
    }

    /// Read the next message.
    pub async fn next_message(&mut self) -> Result<JSONRPCMessage> {
        let line = timeout(Duration::from_secs(5), self.reader.next())
            .await
            .map_err(|_| Error::Transport("timed out waiting for message".into()))?
            .ok_or_else(|| Error::Transport("connection closed".into()))?
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(serde_json::from_str(&line)?)
    }

    /// Send a request and wait for its response or error message.
    ///
    /// Notifications that arrive first are kept for [`take_notifications`](Self::take_notifications).
    pub async fn request(&mut self, method: &str, params: Option<Value>) -> Result<JSONRPCMessage> {
        self.next_id += 1;
        let id = RequestId::Number(self.next_id);
        let request = JSONRPCRequest::new(id.clone(), method, params);
        self.send_line(&serde_json::to_string(&request)?).await?;
        loop {
            match self.next_message().await? {
                JSONRPCMessage::Notification(notification) => {
                    self.notifications.push(notification)
                }
                JSONRPCMessage::Response(response) if response.id == id => {
                    return Ok(JSONRPCMessage::Response(response));
                }
                JSONRPCMessage::Error(error) if error.id.as_ref() == Some(&id) => {
                    return Ok(JSONRPCMessage::Error(error));
                }
                other => {
                    return Err(Error::InvalidRequest(format!(
                        "unexpected message: {other:?}"
                    )));
                }
            }
        }
    }

    /// Send a request and return the `result` of a successful response.
    pub async fn call(&mut self, method: &str, params: Option<Value>) -> Result<Value> {
        match self.request(method, params).await? {
            JSONRPCMessage::Response(response) => Ok(response.result),
            JSONRPCMessage::Error(error) => Err(Error::InternalError(format!(
                "{}: {}",
                error.error.code, error.error.message
            ))),
            other => Err(Error::InvalidRequest(format!("unexpected message: {other:?}"))),
        }
    }

    /// Wait briefly for pending notifications, then drain what was received.
    pub async fn take_notifications(&mut self) -> Vec<JSONRPCNotification> {
        while let Ok(Some(Ok(line))) =
            timeout(Duration::from_millis(20), self.reader.next()).await
        {
            if let Ok(JSONRPCMessage::Notification(notification)) = serde_json::from_str(&line) {
                self.notifications.push(notification);
            }
        }
        std::mem::take(&mut self.notifications)
    }
}

/// Serve a connection built by `factory` over in-memory pipes and return a
/// client wired to it.
pub fn connected_client<F>(factory: F) -> Result<(TestClient, ServerHandle)>
where
    F: Fn() -> Result<Connection> + Send + Sync + 'static,
{
    let (server_reader, client_writer) = io::duplex(64 * 1024);
    let (client_reader, server_writer) = io::duplex(64 * 1024);
    let handle = ServerHandle::from_stream(Server::new(factory), server_reader, server_writer)?;
    let client = TestClient {
        reader: FramedRead::new(client_reader, LinesCodec::new()),
        writer: FramedWrite::new(client_writer, LinesCodec::new()),
        next_id: 0,
        notifications: Vec::new(),
    };
    Ok((client, handle))
}
