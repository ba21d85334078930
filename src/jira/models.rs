//! Serde models for the parts of the Jira REST surface the tools use.
//!
//! Only the fields that are read or written are modelled; everything else in
//! the upstream payloads is ignored during deserialization.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Priority {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transition {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubtaskFields {
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Subtask {
    pub key: String,
    #[serde(default)]
    pub fields: SubtaskFields,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: String,
    pub status: Option<Status>,
    pub reporter: Option<User>,
    pub assignee: Option<User>,
    pub priority: Option<Priority>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub description: Option<String>,
    pub subtasks: Option<Vec<Subtask>>,
    pub resolutiondate: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Issue {
    #[serde(default)]
    pub id: String,
    pub key: String,
    #[serde(rename = "self", default)]
    pub self_link: String,
    #[serde(default)]
    pub fields: IssueFields,
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(default)]
    pub start_at: u32,
    #[serde(default)]
    pub max_results: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

/// Response to an issue creation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatedIssue {
    pub id: String,
    pub key: String,
    #[serde(rename = "self", default)]
    pub self_link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRef {
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueTypeRef {
    pub name: String,
}

/// Field set sent on issue create and edit; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueFieldsPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuetype: Option<IssueTypeRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssuePayload {
    pub fields: IssueFieldsPayload,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub id: String,
    pub author: Option<User>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPage {
    #[serde(default)]
    pub start_at: u32,
    #[serde(default)]
    pub max_results: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorklogPayload {
    pub time_spent_seconds: u64,
    pub started: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// How Jira should adjust the remaining estimate when a worklog is added
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustEstimate {
    Auto,
}

impl AdjustEstimate {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustEstimate::Auto => "auto",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WorklogOptions {
    pub notify: bool,
    pub adjust_estimate: AdjustEstimate,
}

impl Default for WorklogOptions {
    fn default() -> Self {
        Self {
            notify: true,
            adjust_estimate: AdjustEstimate::Auto,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Worklog {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub time_spent_seconds: u64,
    #[serde(default)]
    pub started: String,
    pub author: Option<User>,
}

/// Statuses available to one issue type of a project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueTypeStatuses {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub statuses: Vec<Status>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SprintState {
    Active,
    Future,
    Closed,
}

impl SprintState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SprintState::Active => "active",
            SprintState::Future => "future",
            SprintState::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprint {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintPage {
    #[serde(default)]
    pub max_results: u32,
    #[serde(default)]
    pub start_at: u32,
    #[serde(default)]
    pub is_last: bool,
    #[serde(default)]
    pub values: Vec<Sprint>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_issue_deserialization_with_nulls() {
        let issue: Issue = serde_json::from_value(json!({
            "id": "10001",
            "key": "KP-2",
            "self": "https://example.atlassian.net/rest/api/2/issue/10001",
            "fields": {
                "summary": "Fix login",
                "status": {"id": "3", "name": "In Progress"},
                "assignee": null,
                "priority": null,
                "description": null,
                "subtasks": [{"id": "10002", "key": "KP-3", "fields": {"summary": "Write test"}}]
            },
            "transitions": [{"id": "31", "name": "Done"}]
        }))
        .unwrap();

        assert_eq!(issue.key, "KP-2");
        assert!(issue.fields.assignee.is_none());
        assert_eq!(issue.fields.subtasks.as_ref().map(Vec::len), Some(1));
        assert_eq!(issue.transitions[0].name, "Done");
    }

    #[test]
    fn test_update_payload_skips_absent_fields() {
        let payload = IssuePayload {
            fields: IssueFieldsPayload {
                summary: Some("New title".to_string()),
                ..Default::default()
            },
        };

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"fields": {"summary": "New title"}})
        );
    }

    #[test]
    fn test_worklog_payload_shape() {
        let payload = WorklogPayload {
            time_spent_seconds: 5400,
            started: "2023-05-01T10:00:00.000+0000".to_string(),
            comment: None,
        };

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"timeSpentSeconds": 5400, "started": "2023-05-01T10:00:00.000+0000"})
        );
    }
}
