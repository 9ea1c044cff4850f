//! The forge toolset catalogue.
//!
//! Every operation is described once in a static table: its name, a
//! description and its parameters. [`toolset_group`] turns the table into a
//! [`ToolsetGroup`] whose handlers validate arguments and pass the call
//! through to a [`ForgeBackend`].

use std::sync::Arc;

use forgemcp::{
    Arguments, Error, Result, ServerPrompt, ServerTool, Toolset, ToolsetGroup,
    schema::{CallToolResult, Prompt, PromptArgument, ResourceTemplate, Role, Tool, ToolSchema},
};
use serde_json::{Value, json};

use crate::{backend::ForgeBackend, job_logs};

/// Toolsets enabled when no selection is configured.
pub const DEFAULT_TOOLSETS: [&str; 4] = ["context", "repos", "contents", "pull_requests"];

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// JSON string.
    String,
    /// JSON number; integer ids are numbers too.
    Number,
    /// JSON boolean.
    Boolean,
    /// JSON array of any items.
    Array,
    /// JSON object.
    Object,
}

impl Kind {
    fn json_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

/// One tool parameter.
#[derive(Debug, Clone, Copy)]
pub struct Param {
    /// Argument key.
    pub name: &'static str,
    /// Expected JSON type.
    pub kind: Kind,
    /// Whether a call without it is rejected.
    pub required: bool,
    /// Description shown in the input schema.
    pub description: &'static str,
}

impl Param {
    /// JSON schema of this parameter.
    pub fn schema(&self) -> Value {
        let mut schema = json!({
            "type": self.kind.json_type(),
            "description": self.description,
        });
        if self.kind == Kind::Array {
            schema["items"] = json!({});
        }
        schema
    }

    /// Check that a supplied value has the declared type, and that a
    /// required value is supplied.
    fn check(&self, arguments: &Arguments) -> Result<()> {
        match self.kind {
            Kind::String if self.required => arguments.required_str(self.name).map(drop),
            Kind::String => arguments.optional_str(self.name).map(drop),
            Kind::Number if self.required => arguments.required_u64(self.name).map(drop),
            Kind::Number => arguments.optional_u64(self.name).map(drop),
            Kind::Boolean => match arguments.optional_bool(self.name)? {
                None if self.required => Err(missing(self.name)),
                _ => Ok(()),
            },
            Kind::Array | Kind::Object => match arguments.get(self.name) {
                None if self.required => Err(missing(self.name)),
                None => Ok(()),
                Some(Value::Array(_)) if self.kind == Kind::Array => Ok(()),
                Some(Value::Object(_)) if self.kind == Kind::Object => Ok(()),
                Some(_) => Err(Error::InvalidParams(format!(
                    "parameter {} is not of type {}",
                    self.name,
                    self.kind.json_type()
                ))),
            },
        }
    }
}

fn missing(name: &str) -> Error {
    Error::InvalidParams(format!("missing required parameter: {name}"))
}

const fn req(name: &'static str, kind: Kind, description: &'static str) -> Param {
    Param {
        name,
        kind,
        required: true,
        description,
    }
}

const fn opt(name: &'static str, kind: Kind, description: &'static str) -> Param {
    Param {
        name,
        kind,
        required: false,
        description,
    }
}

/// One forge operation exposed as a tool.
#[derive(Debug)]
pub struct Operation {
    /// Tool name, also the backend operation name.
    pub name: &'static str,
    /// Tool description.
    pub description: &'static str,
    /// Accepted parameters.
    pub params: &'static [Param],
}

/// A toolset entry in the catalogue.
#[derive(Debug)]
pub struct ToolsetDef {
    /// Toolset id.
    pub id: &'static str,
    /// Toolset description.
    pub description: &'static str,
    /// Operations that only read remote state.
    pub read: &'static [Operation],
    /// Operations that modify remote state.
    pub write: &'static [Operation],
}

macro_rules! op {
    ($name:expr, $description:expr, &[$($param:expr),* $(,)?] $(,)?) => {
        Operation {
            name: $name,
            description: $description,
            params: &[$($param),*],
        }
    };
}

const OWNER: Param = req("owner", Kind::String, "Repository owner");
const REPO: Param = req("repo", Kind::String, "Repository name");
const ORG: Param = req("org", Kind::String, "Organization login");
const PAGE: Param = opt("page", Kind::Number, "Page number for pagination (min 1)");
const PER_PAGE: Param = opt("perPage", Kind::Number, "Results per page for pagination (min 1, max 100)");
const QUERY: Param = req("query", Kind::String, "Search query using the forge search syntax");
const SORT: Param = opt("sort", Kind::String, "Sort field");
const ORDER: Param = opt("order", Kind::String, "Sort order: asc or desc");
const ISSUE_NUMBER: Param = req("issue_number", Kind::Number, "Issue number");
const PULL_NUMBER: Param = req("pullNumber", Kind::Number, "Pull request number");
const RUN_ID: Param = req("run_id", Kind::Number, "Workflow run ID");
const ALERT_NUMBER: Param = req("alertNumber", Kind::Number, "Alert number");
const BRANCH: Param = req("branch", Kind::String, "Branch name");
const MESSAGE: Param = req("message", Kind::String, "Commit message");
const PATH: Param = req("path", Kind::String, "Path to the file");
const SUB_ISSUE_ID: Param = req("sub_issue_id", Kind::Number, "ID of the sub-issue");
const GHSA_ID: Param = req("ghsaId", Kind::String, "Advisory identifier, for example GHSA-xxxx-xxxx-xxxx");

/// The full catalogue, in registration order.
pub static TOOLSETS: &[ToolsetDef] = &[
    ToolsetDef {
        id: "context",
        description: "Tools that provide context about the current user and the forge you are operating in",
        read: &[
            op!("get_me", "Get details of the authenticated user. Use this when a request is about the user's own profile.", &[]),
            op!("get_teams", "Get the teams the user is a member of. Limited to organizations accessible with the current credentials.", &[
                opt("user", Kind::String, "Username to get teams for; defaults to the authenticated user"),
            ]),
            op!("get_team_members", "Get member usernames of a specific team in an organization.", &[
                ORG,
                req("team_slug", Kind::String, "Team slug"),
            ]),
        ],
        write: &[],
    },
    ToolsetDef {
        id: "repos",
        description: "Repository management",
        read: &[
            op!("search_repositories", "Find repositories by name, description, readme, topics or other metadata.", &[
                QUERY, PAGE, PER_PAGE,
            ]),
            op!("list_commits", "Get a list of commits of a branch in a repository. Returns at least 30 results per page by default.", &[
                OWNER, REPO,
                opt("sha", Kind::String, "Commit SHA, branch or tag name to list commits of"),
                opt("author", Kind::String, "Author username or email address to filter commits by"),
                PAGE, PER_PAGE,
            ]),
            op!("search_code", "Fast and precise code search across all repositories. Use for locating exact symbols, functions or classes.", &[
                QUERY, SORT, ORDER, PAGE, PER_PAGE,
            ]),
            op!("get_commit", "Get details for a commit from a repository.", &[
                OWNER, REPO,
                req("sha", Kind::String, "Commit SHA, branch name, or tag name"),
                opt("include_diff", Kind::Boolean, "Whether to include file diffs and stats in the response"),
                PAGE, PER_PAGE,
            ]),
            op!("list_branches", "List branches in a repository.", &[OWNER, REPO, PAGE, PER_PAGE]),
        ],
        write: &[
            op!("create_repository", "Create a new repository in your account or specified organization.", &[
                req("name", Kind::String, "Repository name"),
                opt("description", Kind::String, "Repository description"),
                opt("organization", Kind::String, "Organization to create the repository in"),
                opt("private", Kind::Boolean, "Whether the repository is private"),
                opt("autoInit", Kind::Boolean, "Initialize with a README"),
            ]),
            op!("fork_repository", "Fork a repository to your account or specified organization.", &[
                OWNER, REPO,
                opt("organization", Kind::String, "Organization to fork to"),
            ]),
            op!("create_branch", "Create a new branch in a repository.", &[
                OWNER, REPO,
                req("branch", Kind::String, "Name for the new branch"),
                opt("from_branch", Kind::String, "Source branch; defaults to the repository's default branch"),
            ]),
        ],
    },
    ToolsetDef {
        id: "contents",
        description: "Repository contents",
        read: &[
            op!("get_file_contents", "Get the contents of a file or directory from a repository.", &[
                OWNER, REPO,
                opt("path", Kind::String, "Path to file or directory"),
                opt("ref", Kind::String, "Git ref such as refs/tags/{tag}, refs/heads/{branch} or refs/pull/{pr_number}/head"),
                opt("sha", Kind::String, "Commit SHA; overrides ref when given"),
            ]),
        ],
        write: &[
            op!("create_or_update_file", "Create or update a single file in a repository. Updating requires the SHA of the file being replaced.", &[
                OWNER, REPO, PATH,
                req("content", Kind::String, "Content of the file"),
                MESSAGE, BRANCH,
                opt("sha", Kind::String, "Blob SHA of the file being replaced"),
            ]),
            op!("push_files", "Push multiple files to a repository in a single commit.", &[
                OWNER, REPO, BRANCH,
                req("files", Kind::Array, "Array of file objects to push, each with path and content"),
                MESSAGE,
            ]),
            op!("delete_file", "Delete a file from a repository.", &[OWNER, REPO, PATH, MESSAGE, BRANCH]),
        ],
    },
    ToolsetDef {
        id: "releases",
        description: "Repository releases and tags",
        read: &[
            op!("list_releases", "List releases in a repository.", &[OWNER, REPO, PAGE, PER_PAGE]),
            op!("get_latest_release", "Get the latest release in a repository.", &[OWNER, REPO]),
            op!("get_release_by_tag", "Get a specific release by its tag name.", &[
                OWNER, REPO,
                req("tag", Kind::String, "Tag name, for example v1.0.0"),
            ]),
            op!("list_tags", "List git tags in a repository.", &[OWNER, REPO, PAGE, PER_PAGE]),
            op!("get_tag", "Get details about a specific git tag.", &[
                OWNER, REPO,
                req("tag", Kind::String, "Tag name"),
            ]),
        ],
        write: &[],
    },
    ToolsetDef {
        id: "issues",
        description: "Issues",
        read: &[
            op!("get_issue", "Get details of a specific issue.", &[OWNER, REPO, ISSUE_NUMBER]),
            op!("search_issues", "Search for issues in repositories using the issues search syntax, scoped to is:issue.", &[
                QUERY,
                opt("owner", Kind::String, "Optional repository owner to scope the search"),
                opt("repo", Kind::String, "Optional repository name to scope the search"),
                SORT, ORDER, PAGE, PER_PAGE,
            ]),
            op!("list_issues", "List issues in a repository. Use 'after' with the cursor from the previous page to paginate.", &[
                OWNER, REPO,
                opt("state", Kind::String, "Filter by state: OPEN or CLOSED"),
                opt("labels", Kind::Array, "Filter by labels"),
                opt("since", Kind::String, "Only issues updated after this ISO 8601 timestamp"),
                opt("after", Kind::String, "Cursor for pagination"),
                PER_PAGE,
            ]),
            op!("get_issue_comments", "Get comments for a specific issue.", &[OWNER, REPO, ISSUE_NUMBER, PAGE, PER_PAGE]),
            op!("list_issue_types", "List supported issue types for an organization.", &[
                req("owner", Kind::String, "Organization owner"),
            ]),
        ],
        write: &[
            op!("create_issue", "Create a new issue in a repository.", &[
                OWNER, REPO,
                req("title", Kind::String, "Issue title"),
                opt("body", Kind::String, "Issue body content"),
                opt("assignees", Kind::Array, "Usernames to assign to this issue"),
                opt("labels", Kind::Array, "Labels to apply to this issue"),
                opt("milestone", Kind::Number, "Milestone number"),
                opt("type", Kind::String, "Issue type; see 'list_issue_types'"),
            ]),
            op!("add_issue_comment", "Add a comment to a specific issue. Also usable to comment on pull requests.", &[
                OWNER, REPO, ISSUE_NUMBER,
                req("body", Kind::String, "Comment content"),
            ]),
            op!("update_issue", "Update an existing issue.", &[
                OWNER, REPO, ISSUE_NUMBER,
                opt("title", Kind::String, "New title"),
                opt("body", Kind::String, "New description"),
                opt("state", Kind::String, "New state: open or closed"),
                opt("state_reason", Kind::String, "Reason for the state change: completed, not_planned or duplicate"),
                opt("duplicate_of", Kind::Number, "Issue number this issue duplicates; only with state_reason duplicate"),
                opt("labels", Kind::Array, "New labels"),
                opt("assignees", Kind::Array, "New assignees"),
                opt("milestone", Kind::Number, "New milestone number"),
            ]),
            op!("assign_coding_agent_to_issue", "Assign the forge's coding agent to an issue, which opens a pull request with its proposed fix.", &[
                OWNER, REPO,
                req("issueNumber", Kind::Number, "Issue number"),
            ]),
        ],
    },
    ToolsetDef {
        id: "sub_issues",
        description: "Sub-issue management",
        read: &[
            op!("list_sub_issues", "List sub-issues for a specific issue.", &[OWNER, REPO, ISSUE_NUMBER, PAGE, PER_PAGE]),
        ],
        write: &[
            op!("add_sub_issue", "Add a sub-issue to a parent issue.", &[
                OWNER, REPO, ISSUE_NUMBER, SUB_ISSUE_ID,
                opt("replace_parent", Kind::Boolean, "Replace the sub-issue's current parent"),
            ]),
            op!("remove_sub_issue", "Remove a sub-issue from a parent issue.", &[OWNER, REPO, ISSUE_NUMBER, SUB_ISSUE_ID]),
            op!("reprioritize_sub_issue", "Move a sub-issue to a new position within its parent's list.", &[
                OWNER, REPO, ISSUE_NUMBER, SUB_ISSUE_ID,
                opt("after_id", Kind::Number, "Place after this sub-issue ID"),
                opt("before_id", Kind::Number, "Place before this sub-issue ID"),
            ]),
        ],
    },
    ToolsetDef {
        id: "orgs",
        description: "Organization related tools",
        read: &[
            op!("search_orgs", "Find organizations by name, location or other metadata.", &[QUERY, SORT, ORDER, PAGE, PER_PAGE]),
        ],
        write: &[],
    },
    ToolsetDef {
        id: "users",
        description: "User related tools",
        read: &[
            op!("search_users", "Find users by username, real name or other profile information.", &[QUERY, SORT, ORDER, PAGE, PER_PAGE]),
        ],
        write: &[],
    },
    ToolsetDef {
        id: "pull_requests",
        description: "Pull request operations",
        read: &[
            op!("get_pull_request", "Get details of a specific pull request.", &[OWNER, REPO, PULL_NUMBER]),
            op!("list_pull_requests", "List pull requests in a repository. For filtering by author use 'search_pull_requests'.", &[
                OWNER, REPO,
                opt("state", Kind::String, "Filter by state: open, closed or all"),
                opt("head", Kind::String, "Filter by head user/org and branch"),
                opt("base", Kind::String, "Filter by base branch"),
                SORT,
                opt("direction", Kind::String, "Sort direction"),
                PAGE, PER_PAGE,
            ]),
            op!("get_pull_request_files", "Get the files changed in a specific pull request.", &[OWNER, REPO, PULL_NUMBER, PAGE, PER_PAGE]),
            op!("search_pull_requests", "Search for pull requests using the issues search syntax, scoped to is:pr.", &[
                QUERY,
                opt("owner", Kind::String, "Optional repository owner to scope the search"),
                opt("repo", Kind::String, "Optional repository name to scope the search"),
                SORT, ORDER, PAGE, PER_PAGE,
            ]),
            op!("get_pull_request_status", "Get the combined status of all status checks for a pull request.", &[OWNER, REPO, PULL_NUMBER]),
            op!("get_pull_request_diff", "Get the diff of a pull request.", &[OWNER, REPO, PULL_NUMBER]),
        ],
        write: &[
            op!("create_pull_request", "Create a new pull request in a repository.", &[
                OWNER, REPO,
                req("title", Kind::String, "Pull request title"),
                opt("body", Kind::String, "Pull request description"),
                req("head", Kind::String, "Branch containing the changes"),
                req("base", Kind::String, "Branch to merge into"),
                opt("draft", Kind::Boolean, "Create as a draft"),
                opt("maintainer_can_modify", Kind::Boolean, "Allow maintainer edits"),
            ]),
            op!("update_pull_request", "Update an existing pull request.", &[
                OWNER, REPO, PULL_NUMBER,
                opt("title", Kind::String, "New title"),
                opt("body", Kind::String, "New description"),
                opt("state", Kind::String, "New state: open or closed"),
                opt("draft", Kind::Boolean, "Mark as draft or ready for review"),
                opt("base", Kind::String, "New base branch"),
                opt("maintainer_can_modify", Kind::Boolean, "Allow maintainer edits"),
                opt("reviewers", Kind::Array, "Usernames to request reviews from"),
            ]),
            op!("merge_pull_request", "Merge a pull request.", &[
                OWNER, REPO, PULL_NUMBER,
                opt("commit_title", Kind::String, "Title for the merge commit"),
                opt("commit_message", Kind::String, "Extra detail for the merge commit"),
                opt("merge_method", Kind::String, "Merge method: merge, squash or rebase"),
            ]),
            op!("update_pull_request_branch", "Update the branch of a pull request with the latest changes from the base branch.", &[
                OWNER, REPO, PULL_NUMBER,
                opt("expectedHeadSha", Kind::String, "Expected SHA of the pull request's HEAD ref"),
            ]),
        ],
    },
    ToolsetDef {
        id: "pull_request_reviews",
        description: "Pull request review operations",
        read: &[
            op!("get_pull_request_review_comments", "Get review comments for a specific pull request.", &[OWNER, REPO, PULL_NUMBER]),
            op!("get_pull_request_reviews", "Get reviews for a specific pull request.", &[OWNER, REPO, PULL_NUMBER]),
        ],
        write: &[
            op!("request_automated_review", "Request an automated review for a pull request.", &[OWNER, REPO, PULL_NUMBER]),
            op!("create_and_submit_pull_request_review", "Create and submit a review for a pull request without review comments.", &[
                OWNER, REPO, PULL_NUMBER,
                req("body", Kind::String, "Review comment text"),
                req("event", Kind::String, "Review action: APPROVE, REQUEST_CHANGES or COMMENT"),
                opt("commitID", Kind::String, "SHA of the commit to review"),
            ]),
            op!("create_pending_pull_request_review", "Create a pending review for a pull request. Add comments with 'add_comment_to_pending_review'.", &[
                OWNER, REPO, PULL_NUMBER,
                opt("commitID", Kind::String, "SHA of the commit to review"),
            ]),
            op!("add_comment_to_pending_review", "Add a review comment to the requester's latest pending pull request review.", &[
                OWNER, REPO, PULL_NUMBER, PATH,
                req("body", Kind::String, "Review comment text"),
                req("subjectType", Kind::String, "Level the comment targets: FILE or LINE"),
                opt("line", Kind::Number, "Line of the blob the comment applies to"),
                opt("side", Kind::String, "Side of the diff: LEFT or RIGHT"),
                opt("startLine", Kind::Number, "First line of a multi-line comment"),
                opt("startSide", Kind::String, "Starting side of a multi-line comment"),
            ]),
            op!("submit_pending_pull_request_review", "Submit the requester's latest pending pull request review.", &[
                OWNER, REPO, PULL_NUMBER,
                req("event", Kind::String, "Review action: APPROVE, REQUEST_CHANGES or COMMENT"),
                opt("body", Kind::String, "Review summary"),
            ]),
            op!("delete_pending_pull_request_review", "Delete the requester's latest pending pull request review.", &[OWNER, REPO, PULL_NUMBER]),
        ],
    },
    ToolsetDef {
        id: "actions",
        description: "Workflows and CI/CD operations",
        read: &[
            op!("list_workflows", "List workflows in a repository.", &[OWNER, REPO, PAGE, PER_PAGE]),
            op!("list_workflow_runs", "List runs for a specific workflow.", &[
                OWNER, REPO,
                req("workflow_id", Kind::String, "Workflow ID or file name"),
                opt("branch", Kind::String, "Filter by branch"),
                opt("status", Kind::String, "Filter by run status"),
                PAGE, PER_PAGE,
            ]),
            op!("get_workflow_run", "Get details of a specific workflow run.", &[OWNER, REPO, RUN_ID]),
            op!("get_workflow_run_logs", "Download the logs archive of a workflow run. Prefer 'get_job_logs' with failed_only for debugging.", &[OWNER, REPO, RUN_ID]),
            op!("list_workflow_jobs", "List jobs for a specific workflow run.", &[
                OWNER, REPO, RUN_ID,
                opt("filter", Kind::String, "Filter jobs by completion time: latest or all"),
                PAGE, PER_PAGE,
            ]),
            op!("list_workflow_run_artifacts", "List artifacts of a workflow run.", &[OWNER, REPO, RUN_ID, PAGE, PER_PAGE]),
            op!("download_workflow_run_artifact", "Get a download URL for a workflow run artifact.", &[
                OWNER, REPO,
                req("artifact_id", Kind::Number, "Artifact ID"),
            ]),
            op!("get_workflow_run_usage", "Get usage metrics for a workflow run.", &[OWNER, REPO, RUN_ID]),
        ],
        write: &[
            op!("run_workflow", "Run a workflow by ID or file name.", &[
                OWNER, REPO,
                req("workflow_id", Kind::String, "Workflow ID or file name"),
                req("ref", Kind::String, "Git reference to run the workflow on"),
                opt("inputs", Kind::Object, "Inputs the workflow accepts"),
            ]),
            op!("rerun_workflow_run", "Re-run an entire workflow run.", &[OWNER, REPO, RUN_ID]),
            op!("rerun_failed_jobs", "Re-run only the failed jobs of a workflow run.", &[OWNER, REPO, RUN_ID]),
            op!("cancel_workflow_run", "Cancel a workflow run.", &[OWNER, REPO, RUN_ID]),
            op!("delete_workflow_run_logs", "Delete the logs of a workflow run.", &[OWNER, REPO, RUN_ID]),
        ],
    },
    ToolsetDef {
        id: "code_security",
        description: "Code security related tools, such as code scanning",
        read: &[
            op!("get_code_scanning_alert", "Get details of a specific code scanning alert.", &[OWNER, REPO, ALERT_NUMBER]),
            op!("list_code_scanning_alerts", "List code scanning alerts in a repository.", &[
                OWNER, REPO,
                opt("state", Kind::String, "Filter by state: open, closed, dismissed or fixed"),
                opt("severity", Kind::String, "Filter by severity"),
                opt("ref", Kind::String, "Git reference for the results"),
                opt("tool_name", Kind::String, "Name of the scanning tool"),
            ]),
        ],
        write: &[],
    },
    ToolsetDef {
        id: "secret_protection",
        description: "Secret protection related tools, such as secret scanning",
        read: &[
            op!("get_secret_scanning_alert", "Get details of a specific secret scanning alert.", &[OWNER, REPO, ALERT_NUMBER]),
            op!("list_secret_scanning_alerts", "List secret scanning alerts in a repository.", &[
                OWNER, REPO,
                opt("state", Kind::String, "Filter by state: open or resolved"),
                opt("secret_type", Kind::String, "Comma-separated secret types to return"),
                opt("resolution", Kind::String, "Filter by resolution"),
            ]),
        ],
        write: &[],
    },
    ToolsetDef {
        id: "dependabot",
        description: "Dependency alert tools",
        read: &[
            op!("get_dependabot_alert", "Get details of a specific dependency alert.", &[OWNER, REPO, ALERT_NUMBER]),
            op!("list_dependabot_alerts", "List dependency alerts in a repository.", &[
                OWNER, REPO,
                opt("state", Kind::String, "Filter by state: open, fixed, dismissed or auto_dismissed"),
                opt("severity", Kind::String, "Filter by severity"),
            ]),
        ],
        write: &[],
    },
    ToolsetDef {
        id: "notifications",
        description: "Notification related tools",
        read: &[
            op!("list_notifications", "List notifications for the authenticated user.", &[
                opt("filter", Kind::String, "Filter: default, include_read_notifications or only_participating"),
                opt("participating", Kind::Boolean, "Only notifications the user directly participates in"),
                opt("since", Kind::String, "Only notifications updated after this ISO 8601 timestamp"),
                opt("before", Kind::String, "Only notifications updated before this ISO 8601 timestamp"),
                opt("owner", Kind::String, "Optional repository owner"),
                opt("repo", Kind::String, "Optional repository name"),
                PAGE, PER_PAGE,
            ]),
            op!("get_notification_details", "Get detailed information for a specific notification.", &[
                req("notificationID", Kind::String, "Notification ID"),
            ]),
        ],
        write: &[
            op!("dismiss_notification", "Dismiss a notification by marking it read or done.", &[
                req("threadID", Kind::String, "Notification thread ID"),
                opt("state", Kind::String, "New state: read or done"),
            ]),
            op!("mark_all_notifications_read", "Mark all notifications as read.", &[
                opt("lastReadAt", Kind::String, "ISO 8601 timestamp; notifications updated after it stay unread"),
                opt("owner", Kind::String, "Optional repository owner"),
                opt("repo", Kind::String, "Optional repository name"),
            ]),
            op!("manage_notification_subscription", "Ignore, watch or delete a notification thread subscription.", &[
                req("notificationID", Kind::String, "Notification ID"),
                req("action", Kind::String, "Action: ignore, watch or delete"),
            ]),
            op!("manage_repository_notification_subscription", "Ignore, watch or delete repository notifications.", &[
                OWNER, REPO,
                req("action", Kind::String, "Action: ignore, watch or delete"),
            ]),
        ],
    },
    ToolsetDef {
        id: "experiments",
        description: "Experimental features that are not considered stable yet",
        read: &[],
        write: &[],
    },
    ToolsetDef {
        id: "discussions",
        description: "Discussion related tools",
        read: &[
            op!("list_discussions", "List discussions for a repository or organization.", &[
                req("owner", Kind::String, "Repository owner"),
                opt("repo", Kind::String, "Repository name; omit to query organization discussions"),
                opt("category", Kind::String, "Category ID to filter by"),
                opt("orderBy", Kind::String, "Order by field"),
                opt("direction", Kind::String, "Order direction"),
                opt("after", Kind::String, "Cursor for pagination"),
                PER_PAGE,
            ]),
            op!("get_discussion", "Get a specific discussion by ID.", &[
                OWNER, REPO,
                req("discussionNumber", Kind::Number, "Discussion number"),
            ]),
            op!("get_discussion_comments", "Get comments from a discussion.", &[
                OWNER, REPO,
                req("discussionNumber", Kind::Number, "Discussion number"),
                opt("after", Kind::String, "Cursor for pagination"),
                PER_PAGE,
            ]),
            op!("list_discussion_categories", "List discussion categories with their id and name.", &[
                req("owner", Kind::String, "Repository owner"),
                opt("repo", Kind::String, "Repository name; omit to query organization categories"),
            ]),
        ],
        write: &[],
    },
    ToolsetDef {
        id: "gists",
        description: "Gist related tools",
        read: &[
            op!("list_gists", "List gists for a user.", &[
                opt("username", Kind::String, "Username; defaults to the authenticated user"),
                opt("since", Kind::String, "Only gists updated after this ISO 8601 timestamp"),
                PAGE, PER_PAGE,
            ]),
        ],
        write: &[
            op!("create_gist", "Create a new gist.", &[
                opt("description", Kind::String, "Description of the gist"),
                req("filename", Kind::String, "Filename for the gist"),
                req("content", Kind::String, "Content of the gist"),
                opt("public", Kind::Boolean, "Whether the gist is public"),
            ]),
            op!("update_gist", "Update an existing gist.", &[
                req("gist_id", Kind::String, "ID of the gist to update"),
                opt("description", Kind::String, "Updated description"),
                req("filename", Kind::String, "Filename to update or create"),
                req("content", Kind::String, "Content for the file"),
            ]),
        ],
    },
    ToolsetDef {
        id: "security_advisories",
        description: "Security advisories related tools",
        read: &[
            op!("list_global_security_advisories", "List global security advisories.", &[
                opt("ghsaId", Kind::String, "Filter by advisory identifier"),
                opt("type", Kind::String, "Advisory type"),
                opt("ecosystem", Kind::String, "Filter by package ecosystem"),
                opt("severity", Kind::String, "Filter by severity"),
                opt("affects", Kind::String, "Filter by affected package or version"),
            ]),
            op!("get_global_security_advisory", "Get a global security advisory.", &[GHSA_ID]),
            op!("list_repository_security_advisories", "List repository security advisories.", &[
                OWNER, REPO,
                opt("state", Kind::String, "Filter by advisory state"),
                SORT,
                opt("direction", Kind::String, "Sort direction"),
            ]),
            op!("list_org_repository_security_advisories", "List repository security advisories for an organization.", &[
                ORG,
                opt("state", Kind::String, "Filter by advisory state"),
                SORT,
                opt("direction", Kind::String, "Sort direction"),
            ]),
        ],
        write: &[],
    },
    ToolsetDef {
        id: "projects",
        description: "Project board related tools",
        read: &[
            op!("list_projects", "List projects for a user or organization.", &[
                req("owner", Kind::String, "User or organization login"),
                req("owner_type", Kind::String, "Owner type: user or org"),
                opt("query", Kind::String, "Filter projects by title text"),
                PER_PAGE,
            ]),
        ],
        write: &[],
    },
    ToolsetDef {
        id: "stargazers",
        description: "Starring related tools",
        read: &[
            op!("list_starred_repositories", "List starred repositories.", &[
                opt("username", Kind::String, "Username; defaults to the authenticated user"),
                opt("sort", Kind::String, "Sort by: created or updated"),
                opt("direction", Kind::String, "Sort direction"),
                PAGE, PER_PAGE,
            ]),
        ],
        write: &[
            op!("star_repository", "Star a repository.", &[OWNER, REPO]),
            op!("unstar_repository", "Unstar a repository.", &[OWNER, REPO]),
        ],
    },
];

/// Human readable title for an operation name: `get_me` becomes `Get me`.
fn title(name: &str) -> String {
    let words = name.replace('_', " ");
    let mut chars = words.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Input schema for a parameter list.
pub fn input_schema(params: &[Param]) -> ToolSchema {
    params.iter().fold(ToolSchema::empty(), |schema, param| {
        let schema = schema.with_property(param.name, param.schema());
        if param.required {
            schema.with_required(param.name)
        } else {
            schema
        }
    })
}

/// Validate `arguments` against a parameter list.
pub fn validate(params: &[Param], arguments: &Arguments) -> Result<()> {
    params.iter().try_for_each(|param| param.check(arguments))
}

/// Build the tool for an operation, passing calls through to `backend`.
pub fn passthrough_tool(
    operation: &'static Operation,
    read_only: bool,
    backend: Arc<dyn ForgeBackend>,
) -> ServerTool {
    let tool = Tool::new(operation.name, input_schema(operation.params))
        .with_description(operation.description)
        .with_annotation_title(title(operation.name))
        .with_read_only_hint(read_only);
    ServerTool::new(tool, move |_ctx, arguments| {
        let backend = backend.clone();
        Box::pin(async move {
            validate(operation.params, &arguments)?;
            let value = backend.invoke(operation.name, &arguments).await?;
            Ok(CallToolResult::new().with_json(&value)?)
        })
    })
}

/// Templates for reading repository contents as resources.
fn content_templates() -> Vec<ResourceTemplate> {
    [
        ("repository_content", "repo://{owner}/{repo}/contents{/path*}", "Repository content on the default branch"),
        ("repository_content_branch", "repo://{owner}/{repo}/refs/heads/{branch}/contents{/path*}", "Repository content on a branch"),
        ("repository_content_commit", "repo://{owner}/{repo}/sha/{sha}/contents{/path*}", "Repository content at a commit"),
        ("repository_content_tag", "repo://{owner}/{repo}/refs/tags/{tag}/contents{/path*}", "Repository content at a tag"),
        ("repository_content_pr", "repo://{owner}/{repo}/refs/pull/{prNumber}/head/contents{/path*}", "Repository content at a pull request head"),
    ]
    .into_iter()
    .map(|(name, uri, description)| ResourceTemplate::new(name, uri).with_description(description))
    .collect()
}

/// Guided workflows published with the issues toolset.
fn issue_prompts() -> Vec<ServerPrompt> {
    vec![
        ServerPrompt::new(
            Prompt::new("AssignCodingAgent")
                .with_description("Assign the coding agent to open issues in a repository")
                .with_argument(PromptArgument::new("repo", "Repository as owner/name", true)),
        )
        .with_message(
            Role::User,
            "I want the coding agent to work on open issues in {repo}. List the open issues and pick the ones with a clear, self-contained scope.",
        )
        .with_message(
            Role::Assistant,
            "I'll list the open issues in {repo}, confirm the candidates with you, then call 'assign_coding_agent_to_issue' for each one.",
        ),
        ServerPrompt::new(
            Prompt::new("IssueToFixWorkflow")
                .with_description("Create an issue for a problem and open a pull request that fixes it")
                .with_argument(PromptArgument::new("owner", "Repository owner", true))
                .with_argument(PromptArgument::new("repo", "Repository name", true))
                .with_argument(PromptArgument::new("title", "Issue title", true))
                .with_argument(PromptArgument::new("description", "Issue description", true))
                .with_argument(PromptArgument::new("labels", "Comma-separated labels", false))
                .with_argument(PromptArgument::new("assignees", "Comma-separated assignees", false)),
        )
        .with_message(
            Role::User,
            "Create an issue titled '{title}' in {owner}/{repo} describing: {description}. Labels: {labels}. Assignees: {assignees}. Then open a pull request that fixes it.",
        )
        .with_message(
            Role::Assistant,
            "I'll create the issue with 'create_issue', implement the fix on a new branch and open a pull request whose body contains 'Fixes #<issue number>'.",
        ),
    ]
}

/// Build the catalogue's toolset group. All toolsets start disabled.
pub fn toolset_group(
    read_only: bool,
    backend: Arc<dyn ForgeBackend>,
    content_window_size: usize,
) -> Result<ToolsetGroup> {
    let mut group = ToolsetGroup::new(read_only);
    for def in TOOLSETS {
        let mut toolset = Toolset::new(def.id, def.description)
            .add_read_tools(
                def.read
                    .iter()
                    .map(|operation| passthrough_tool(operation, true, backend.clone())),
            )
            .add_write_tools(
                def.write
                    .iter()
                    .map(|operation| passthrough_tool(operation, false, backend.clone())),
            );
        toolset = match def.id {
            "contents" => toolset.add_resource_templates(content_templates()),
            "issues" => toolset.add_prompts(issue_prompts()),
            "actions" => toolset.add_read_tools([job_logs::get_job_logs(
                backend.clone(),
                content_window_size,
            )]),
            _ => toolset,
        };
        group.add_toolset(toolset)?;
    }
    Ok(group)
}
