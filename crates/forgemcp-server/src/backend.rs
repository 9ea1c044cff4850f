//! The seam between catalogue handlers and a forge API.
//!
//! Handlers never talk to a forge directly: they validate their arguments and
//! hand the operation name plus arguments to a [`ForgeBackend`]. The shipped
//! [`FixtureBackend`] replays recorded JSON responses from a directory, which
//! is enough to drive the server end to end without network access.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use forgemcp::{Arguments, Error, Result};
use serde_json::Value;
use tracing::debug;

/// Executes forge operations on behalf of tool handlers.
#[async_trait]
pub trait ForgeBackend: Send + Sync {
    /// Run `operation` with validated `arguments` and return its JSON result.
    async fn invoke(&self, operation: &str, arguments: &Arguments) -> Result<Value>;
}

/// Backend replaying `<dir>/<operation>.json` fixtures.
#[derive(Debug, Clone, Default)]
pub struct FixtureBackend {
    dir: Option<PathBuf>,
}

impl FixtureBackend {
    /// A backend reading fixtures from `dir`, or a detached backend when `None`.
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    /// The fixture directory, if any.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }
}

#[async_trait]
impl ForgeBackend for FixtureBackend {
    async fn invoke(&self, operation: &str, arguments: &Arguments) -> Result<Value> {
        let Some(dir) = &self.dir else {
            return Err(Error::tool_execution_failed(
                operation,
                "no forge backend is attached; start the server with --fixtures <dir>",
            ));
        };
        let path = dir.join(format!("{operation}.json"));
        debug!(operation, path = %path.display(), args = arguments.as_map().len(), "replaying fixture");
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(Error::tool_execution_failed(
                    operation,
                    format!("no fixture recorded at {}", path.display()),
                ));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&raw)?)
    }
}
