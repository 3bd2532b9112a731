//! Reduced mirrors of the upstream resource payloads.
//!
//! Every struct deserializes from the raw GitLab JSON (unknown fields are
//! dropped) and serializes back out as the public response shape. Nothing
//! here is stored; each value lives for one request.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    pub username: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    Opened,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeRequestState {
    Opened,
    Closed,
    Locked,
    Merged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Created,
    WaitingForResource,
    Preparing,
    Pending,
    Running,
    Success,
    Failed,
    Canceled,
    Skipped,
    Manual,
    Scheduled,
}

/// Abbreviated project shape used by list responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: u64,
    pub name: String,
    pub path_with_namespace: String,
    pub web_url: String,
    #[serde(default)]
    pub description: Option<String>,
    pub visibility: String,
    #[serde(default)]
    pub default_branch: Option<String>,
}

/// Full project shape returned by get and create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDetail {
    pub id: u64,
    pub name: String,
    pub path: String,
    pub path_with_namespace: String,
    pub web_url: String,
    #[serde(default)]
    pub description: Option<String>,
    pub visibility: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    pub ssh_url_to_repo: String,
    pub http_url_to_repo: String,
    pub created_at: String,
    pub last_activity_at: String,
    pub star_count: u64,
    pub forks_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueSummary {
    pub iid: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub state: IssueState,
    #[serde(default)]
    pub labels: Vec<String>,
    pub author: UserRef,
    pub created_at: String,
    pub updated_at: String,
    pub web_url: String,
}

/// Issue detail adds assignees on top of the list shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueDetail {
    pub iid: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub state: IssueState,
    #[serde(default)]
    pub labels: Vec<String>,
    pub author: UserRef,
    #[serde(default)]
    pub assignees: Vec<UserRef>,
    pub created_at: String,
    pub updated_at: String,
    pub web_url: String,
}

fn created_message() -> String {
    "Issue created successfully".to_string()
}

/// Creation acknowledgement; `message` is ours, the rest mirrors upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueCreated {
    pub iid: u64,
    pub title: String,
    pub state: IssueState,
    pub web_url: String,
    #[serde(default = "created_message")]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeRequestSummary {
    pub iid: u64,
    pub title: String,
    pub state: MergeRequestState,
    pub source_branch: String,
    pub target_branch: String,
    pub author: UserRef,
    pub created_at: String,
    pub updated_at: String,
    pub web_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeRequestDetail {
    pub iid: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub state: MergeRequestState,
    pub source_branch: String,
    pub target_branch: String,
    pub author: UserRef,
    #[serde(default)]
    pub assignees: Vec<UserRef>,
    pub created_at: String,
    pub updated_at: String,
    pub web_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: u64,
    pub status: PipelineStatus,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub sha: String,
    pub web_url: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: u64,
    pub name: String,
    pub path: String,
    pub full_path: String,
    pub web_url: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// The authenticated identity behind the upstream credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: u64,
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub web_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: u64,
    pub username: String,
    pub name: String,
    pub state: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub web_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchCommit {
    pub id: String,
    pub short_id: String,
    pub title: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub merged: bool,
    pub protected: bool,
    #[serde(rename = "default")]
    pub is_default: bool,
    pub commit: BranchCommit,
    #[serde(default)]
    pub web_url: Option<String>,
}
