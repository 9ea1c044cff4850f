//! CI job logs, tail-governed.
//!
//! Job logs are unbounded, and the part that matters for debugging is almost
//! always the end. The tool keeps the last `min(tail_lines, window)` lines of
//! each log and tells the agent how to ask for more.

use std::sync::Arc;

use forgemcp::{
    Arguments, Error, Result, ServerTool,
    governor::{Budget, Governor, Truncation, Window},
    schema::{CallToolResult, Tool},
};
use serde::Serialize;
use serde_json::Value;

use crate::{
    backend::ForgeBackend,
    catalog::{Kind, Param, input_schema, validate},
};

/// Lines kept when the caller does not ask for a specific tail.
pub const DEFAULT_TAIL_LINES: u64 = 500;

/// Backend operation listing the jobs of a run.
const LIST_JOBS: &str = "list_workflow_jobs";
/// Backend operation fetching the log text of one job.
const DOWNLOAD_LOGS: &str = "download_job_logs";

const PARAMS: &[Param] = &[
    Param {
        name: "owner",
        kind: Kind::String,
        required: true,
        description: "Repository owner",
    },
    Param {
        name: "repo",
        kind: Kind::String,
        required: true,
        description: "Repository name",
    },
    Param {
        name: "job_id",
        kind: Kind::Number,
        required: false,
        description: "ID of the job; required unless failed_only is set",
    },
    Param {
        name: "run_id",
        kind: Kind::Number,
        required: false,
        description: "Workflow run ID; required with failed_only",
    },
    Param {
        name: "failed_only",
        kind: Kind::Boolean,
        required: false,
        description: "Only return logs of the failed jobs in run_id",
    },
    Param {
        name: "tail_lines",
        kind: Kind::Number,
        required: false,
        description: "Number of lines to return from the end of each log (default 500)",
    },
];

/// Log output for one job.
#[derive(Debug, Serialize)]
struct JobLog {
    job_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    logs: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    truncation: Option<Truncation>,
}

/// Build the `get_job_logs` tool.
pub fn get_job_logs(backend: Arc<dyn ForgeBackend>, content_window_size: usize) -> ServerTool {
    let tool = Tool::new("get_job_logs", input_schema(PARAMS))
        .with_description(
            "Download logs for a workflow job, or efficiently get the logs of all failed jobs in a run with failed_only and run_id.",
        )
        .with_annotation_title("Get job logs")
        .with_read_only_hint(true);
    ServerTool::new(tool, move |_ctx, arguments| {
        let backend = backend.clone();
        Box::pin(async move {
            validate(PARAMS, &arguments)?;
            fetch(backend.as_ref(), &arguments, content_window_size).await
        })
    })
}

/// The governor for one call.
fn governor(tail_lines: u64, content_window_size: usize) -> Governor {
    let requested = usize::try_from(tail_lines).unwrap_or(usize::MAX);
    let lines = requested.min(content_window_size).max(1);
    Governor::new(Budget::Lines(lines))
        .with_window(Window::Tail)
        .with_hint(format!(
            "Request more with a larger 'tail_lines' (at most {content_window_size}), or use 'failed_only' with 'run_id' to skip jobs that passed."
        ))
}

async fn fetch(
    backend: &dyn ForgeBackend,
    arguments: &Arguments,
    content_window_size: usize,
) -> Result<CallToolResult> {
    let tail_lines = arguments
        .optional_u64("tail_lines")?
        .unwrap_or(DEFAULT_TAIL_LINES);
    let governor = governor(tail_lines, content_window_size);
    let failed_only = arguments.optional_bool("failed_only")?.unwrap_or(false);

    if failed_only {
        let Some(run_id) = arguments.optional_u64("run_id")? else {
            return Err(Error::InvalidParams(
                "run_id is required when failed_only is true".into(),
            ));
        };
        return failed_job_logs(backend, arguments, run_id, &governor).await;
    }

    let Some(job_id) = arguments.optional_u64("job_id")? else {
        return Err(Error::InvalidParams(
            "job_id is required unless failed_only is true".into(),
        ));
    };
    let log = job_log(backend, arguments, job_id, None, &governor).await?;
    Ok(CallToolResult::new()
        .with_text_content(render(&log))
        .with_structured_content(serde_json::to_value(&log)?))
}

async fn failed_job_logs(
    backend: &dyn ForgeBackend,
    arguments: &Arguments,
    run_id: u64,
    governor: &Governor,
) -> Result<CallToolResult> {
    let jobs = backend
        .invoke(LIST_JOBS, &scoped(arguments).set("run_id", run_id))
        .await?;
    let failed: Vec<(u64, Option<String>)> = jobs
        .get("jobs")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter(|job| job.get("conclusion").and_then(Value::as_str) == Some("failure"))
        .filter_map(|job| {
            let id = job.get("id").and_then(Value::as_u64)?;
            let name = job.get("name").and_then(Value::as_str).map(str::to_string);
            Some((id, name))
        })
        .collect();

    if failed.is_empty() {
        return Ok(CallToolResult::new()
            .with_text_content(format!("No failed jobs found in run {run_id}"))
            .with_structured_content(serde_json::json!({
                "run_id": run_id,
                "failed_jobs": 0,
                "logs": [],
            })));
    }

    let mut logs = Vec::with_capacity(failed.len());
    for (job_id, name) in failed {
        logs.push(job_log(backend, arguments, job_id, name, governor).await?);
    }
    let text = logs.iter().map(render).collect::<Vec<_>>().join("\n\n");
    Ok(CallToolResult::new()
        .with_text_content(text)
        .with_structured_content(serde_json::json!({
            "run_id": run_id,
            "failed_jobs": logs.len(),
            "logs": logs,
        })))
}

async fn job_log(
    backend: &dyn ForgeBackend,
    arguments: &Arguments,
    job_id: u64,
    name: Option<String>,
    governor: &Governor,
) -> Result<JobLog> {
    let value = backend
        .invoke(DOWNLOAD_LOGS, &scoped(arguments).set("job_id", job_id))
        .await?;
    let Value::String(text) = value else {
        return Err(Error::tool_execution_failed(
            "get_job_logs",
            format!("logs for job {job_id} are not text"),
        ));
    };
    let governed = governor.apply(&text);
    Ok(JobLog {
        job_id,
        name,
        logs: governed.render(),
        truncation: governed.truncation,
    })
}

/// Arguments carrying only the repository coordinates.
fn scoped(arguments: &Arguments) -> Arguments {
    ["owner", "repo"]
        .into_iter()
        .fold(Arguments::new(), |scoped, key| match arguments.get(key) {
            Some(value) => scoped.set(key, value.clone()),
            None => scoped,
        })
}

fn render(log: &JobLog) -> String {
    match &log.name {
        Some(name) => format!("=== job {} ({name}) ===\n{}", log.job_id, log.logs),
        None => format!("=== job {} ===\n{}", log.job_id, log.logs),
    }
}
