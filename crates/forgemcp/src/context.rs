use crate::{
    error::Result,
    schema::{self},
    session::Session,
};

/// Context provided to tool handlers for interacting with the live session.
///
/// This context is only valid for the duration of a single method call and should not
/// be stored or used outside of that scope.
#[derive(Clone)]
pub struct ServerCtx {
    /// Session the call arrived on.
    session: Session,
    /// The current request ID, if this context is handling a request
    pub(crate) request_id: Option<schema::RequestId>,
}

impl ServerCtx {
    /// Create a context bound to a session.
    pub fn new(session: Session) -> Self {
        Self {
            session,
            request_id: None,
        }
    }

    /// Send a notification to the client
    pub fn notify(&self, notification: schema::ServerNotification) -> Result<()> {
        self.session.notify(notification)
    }

    /// The session's tool visibility map.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The id of the request being handled, if any.
    pub fn request_id(&self) -> Option<&schema::RequestId> {
        self.request_id.as_ref()
    }

    /// Create a new context with a specific request ID
    pub(crate) fn with_request_id(&self, request_id: schema::RequestId) -> Self {
        let mut ctx = self.clone();
        ctx.request_id = Some(request_id);
        ctx
    }
}
