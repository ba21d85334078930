//! Upstream Jira access.
//!
//! Two independent clients cover two REST surfaces: [`JiraClient`] talks to the
//! issue API (`/rest/api/2`) and [`AgileClient`] to the board/sprint API
//! (`/rest/agile/1.0`). Tools depend on the [`JiraApi`] and [`AgileApi`] traits
//! so they can be exercised against substitutes.

pub mod agile;
pub mod client;
pub mod errors;
pub mod models;

pub use self::{
    agile::AgileClient,
    client::{JiraClient, JiraClientConfig, RestClient},
    errors::{JiraError, JiraResult},
};

use async_trait::async_trait;

use self::models::{
    CommentPage, Comment, CreatedIssue, Issue, IssuePayload, IssueTypeStatuses, SearchResult,
    SprintPage, SprintState, Worklog, WorklogOptions, WorklogPayload,
};

/// Issue, search, comment, worklog, workflow and project operations
#[async_trait]
pub trait JiraApi: Send + Sync {
    async fn get_issue(&self, issue_key: &str, expand: &[&str]) -> JiraResult<Issue>;

    async fn create_issue(&self, payload: &IssuePayload) -> JiraResult<CreatedIssue>;

    async fn update_issue(
        &self,
        issue_key: &str,
        payload: &IssuePayload,
        notify_users: bool,
    ) -> JiraResult<()>;

    async fn search_issues(
        &self,
        jql: &str,
        start_at: u32,
        max_results: u32,
    ) -> JiraResult<SearchResult>;

    async fn add_comment(&self, issue_key: &str, body: &str) -> JiraResult<Comment>;

    async fn get_comments(&self, issue_key: &str) -> JiraResult<CommentPage>;

    async fn add_worklog(
        &self,
        issue_key: &str,
        payload: &WorklogPayload,
        options: &WorklogOptions,
    ) -> JiraResult<Worklog>;

    async fn transition_issue(&self, issue_key: &str, transition_id: &str) -> JiraResult<()>;

    async fn project_statuses(&self, project_key: &str) -> JiraResult<Vec<IssueTypeStatuses>>;
}

/// Board and sprint operations
#[async_trait]
pub trait AgileApi: Send + Sync {
    async fn board_sprints(
        &self,
        board_id: u64,
        start_at: u32,
        max_results: u32,
        states: &[SprintState],
    ) -> JiraResult<SprintPage>;
}
