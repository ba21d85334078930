use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt::Write;
use std::sync::Arc;
use tracing::info;

use crate::jira::models::{
    Issue, IssueFieldsPayload, IssuePayload, IssueTypeRef, ProjectRef, User,
};
use crate::jira::JiraApi;
use crate::mcp::tools::jira::upstream;
use crate::mcp::tools::{
    optional_str, required_str, ExecutionContext, MCPTool, Permission, ToolError, ToolResult,
};

/// Fetch one issue with its available transitions
pub struct GetIssueTool {
    jira: Arc<dyn JiraApi>,
}

impl GetIssueTool {
    pub fn new(jira: Arc<dyn JiraApi>) -> Self {
        Self { jira }
    }
}

#[async_trait]
impl MCPTool for GetIssueTool {
    fn name(&self) -> &str {
        "jira_get_issue"
    }

    fn description(&self) -> &str {
        "Retrieve detailed information about a specific Jira issue including its status, assignee, description, subtasks, and available transitions"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "issue_key": {
                    "type": "string",
                    "description": "The unique identifier of the Jira issue (e.g., KP-2, PROJ-123)"
                }
            },
            "required": ["issue_key"]
        })
    }

    async fn execute(
        &self,
        params: Value,
        _context: &mut ExecutionContext,
    ) -> Result<ToolResult, ToolError> {
        let issue_key = required_str(&params, "issue_key")?;

        let issue = self
            .jira
            .get_issue(issue_key, &["transitions"])
            .await
            .map_err(upstream("failed to get issue"))?;

        Ok(ToolResult::text(format_issue(&issue)))
    }
}

/// Fixed-layout rendering of an issue. The subtasks section is omitted when
/// there are none; the transitions header is always present.
pub(crate) fn format_issue(issue: &Issue) -> String {
    let fields = &issue.fields;

    let mut subtasks = String::new();
    if let Some(items) = fields.subtasks.as_ref().filter(|items| !items.is_empty()) {
        subtasks.push_str("\nSubtasks:\n");
        for subtask in items {
            let _ = writeln!(subtasks, "- {}: {}", subtask.key, subtask.fields.summary);
        }
    }

    let mut transitions = String::new();
    for transition in &issue.transitions {
        let _ = writeln!(transitions, "- {} (ID: {})", transition.name, transition.id);
    }

    let display_name = |user: &Option<User>| {
        user.as_ref()
            .map(|user| user.display_name.clone())
            .unwrap_or_else(|| "Unassigned".to_string())
    };

    format!(
        "\nKey: {}\nSummary: {}\nStatus: {}\nReporter: {}\nAssignee: {}\nCreated: {}\nUpdated: {}\nPriority: {}\nDescription:\n{}\n{}\nAvailable Transitions:\n{}",
        issue.key,
        fields.summary,
        fields.status.as_ref().map(|s| s.name.as_str()).unwrap_or_default(),
        display_name(&fields.reporter),
        display_name(&fields.assignee),
        fields.created.as_deref().unwrap_or_default(),
        fields.updated.as_deref().unwrap_or_default(),
        fields.priority.as_ref().map(|p| p.name.as_str()).unwrap_or("None"),
        fields.description.as_deref().unwrap_or_default(),
        subtasks,
        transitions,
    )
}

/// Create a new issue in a project
pub struct CreateIssueTool {
    jira: Arc<dyn JiraApi>,
}

impl CreateIssueTool {
    pub fn new(jira: Arc<dyn JiraApi>) -> Self {
        Self { jira }
    }
}

#[async_trait]
impl MCPTool for CreateIssueTool {
    fn name(&self) -> &str {
        "jira_create_issue"
    }

    fn description(&self) -> &str {
        "Create a new Jira issue with specified details. Returns the created issue's key, ID, and URL"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "project_key": {
                    "type": "string",
                    "description": "Project identifier where the issue will be created (e.g., KP, PROJ)"
                },
                "summary": {
                    "type": "string",
                    "description": "Brief title or headline of the issue"
                },
                "description": {
                    "type": "string",
                    "description": "Detailed explanation of the issue"
                },
                "issue_type": {
                    "type": "string",
                    "description": "Type of issue to create (common types: Bug, Task, Story, Epic)"
                }
            },
            "required": ["project_key", "summary", "description", "issue_type"]
        })
    }

    fn required_permissions(&self) -> Vec<Permission> {
        vec![Permission::Write]
    }

    async fn execute(
        &self,
        params: Value,
        _context: &mut ExecutionContext,
    ) -> Result<ToolResult, ToolError> {
        let project_key = required_str(&params, "project_key")?;
        let summary = required_str(&params, "summary")?;
        let description = required_str(&params, "description")?;
        let issue_type = required_str(&params, "issue_type")?;

        let payload = IssuePayload {
            fields: IssueFieldsPayload {
                summary: Some(summary.to_string()),
                description: Some(description.to_string()),
                project: Some(ProjectRef {
                    key: project_key.to_string(),
                }),
                issuetype: Some(IssueTypeRef {
                    name: issue_type.to_string(),
                }),
            },
        };

        let created = self
            .jira
            .create_issue(&payload)
            .await
            .map_err(upstream("failed to create issue"))?;

        info!("Created issue {} in project {}", created.key, project_key);
        Ok(ToolResult::text(format!(
            "Issue created successfully!\nKey: {}\nID: {}\nURL: {}",
            created.key, created.id, created.self_link
        )))
    }
}

/// Partial update of an issue's summary and description
pub struct UpdateIssueTool {
    jira: Arc<dyn JiraApi>,
}

impl UpdateIssueTool {
    pub fn new(jira: Arc<dyn JiraApi>) -> Self {
        Self { jira }
    }
}

#[async_trait]
impl MCPTool for UpdateIssueTool {
    fn name(&self) -> &str {
        "jira_update_issue"
    }

    fn description(&self) -> &str {
        "Modify an existing Jira issue's details. Supports partial updates - only specified fields will be changed"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "issue_key": {
                    "type": "string",
                    "description": "The unique identifier of the issue to update (e.g., KP-2)"
                },
                "summary": {
                    "type": "string",
                    "description": "New title for the issue (optional)"
                },
                "description": {
                    "type": "string",
                    "description": "New description for the issue (optional)"
                }
            },
            "required": ["issue_key"]
        })
    }

    fn required_permissions(&self) -> Vec<Permission> {
        vec![Permission::Write]
    }

    async fn execute(
        &self,
        params: Value,
        _context: &mut ExecutionContext,
    ) -> Result<ToolResult, ToolError> {
        let issue_key = required_str(&params, "issue_key")?;

        let non_empty = |name: &str| {
            optional_str(&params, name)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let payload = IssuePayload {
            fields: IssueFieldsPayload {
                summary: non_empty("summary"),
                description: non_empty("description"),
                ..Default::default()
            },
        };

        self.jira
            .update_issue(issue_key, &payload, true)
            .await
            .map_err(upstream("failed to update issue"))?;

        info!("Updated issue {}", issue_key);
        Ok(ToolResult::text("Issue updated successfully!"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jira::models::{
        CreatedIssue, IssueFields, Priority, Status, Subtask, SubtaskFields, Transition,
    };
    use crate::mcp::tools::jira::fake::FakeJira;

    fn context() -> ExecutionContext {
        ExecutionContext::new("test", json!(1))
    }

    fn sample_issue() -> Issue {
        Issue {
            id: "10001".to_string(),
            key: "KP-2".to_string(),
            self_link: String::new(),
            fields: IssueFields {
                summary: "Fix login".to_string(),
                status: Some(Status {
                    id: "3".to_string(),
                    name: "In Progress".to_string(),
                }),
                reporter: Some(User {
                    display_name: "Ana".to_string(),
                }),
                assignee: None,
                priority: Some(Priority {
                    name: "High".to_string(),
                }),
                created: Some("2024-01-01T10:00:00.000+0000".to_string()),
                updated: Some("2024-01-02T10:00:00.000+0000".to_string()),
                description: Some("Login fails on Safari".to_string()),
                subtasks: None,
                resolutiondate: None,
            },
            transitions: vec![Transition {
                id: "31".to_string(),
                name: "Done".to_string(),
            }],
        }
    }

    #[test]
    fn test_format_issue_layout() {
        let text = format_issue(&sample_issue());
        assert_eq!(
            text,
            "\nKey: KP-2\nSummary: Fix login\nStatus: In Progress\nReporter: Ana\nAssignee: Unassigned\nCreated: 2024-01-01T10:00:00.000+0000\nUpdated: 2024-01-02T10:00:00.000+0000\nPriority: High\nDescription:\nLogin fails on Safari\n\nAvailable Transitions:\n- Done (ID: 31)\n"
        );
        assert!(!text.contains("Subtasks:"));
    }

    #[test]
    fn test_format_issue_subtasks_and_no_transitions() {
        let mut issue = sample_issue();
        issue.transitions.clear();
        issue.fields.priority = None;
        issue.fields.subtasks = Some(vec![Subtask {
            key: "KP-3".to_string(),
            fields: SubtaskFields {
                summary: "Write test".to_string(),
            },
        }]);

        let text = format_issue(&issue);
        assert!(text.contains("Priority: None\n"));
        assert!(text.contains("\nSubtasks:\n- KP-3: Write test\n"));
        assert!(text.ends_with("\nAvailable Transitions:\n"));

        issue.fields.subtasks = Some(vec![]);
        assert!(!format_issue(&issue).contains("Subtasks:"));
    }

    #[tokio::test]
    async fn test_get_issue_requests_transitions() {
        let jira = Arc::new(FakeJira {
            issue: sample_issue(),
            ..Default::default()
        });
        let tool = GetIssueTool::new(jira.clone());

        let result = tool
            .execute(json!({"issue_key": "KP-2"}), &mut context())
            .await
            .unwrap();

        assert!(result.text_content().contains("Key: KP-2"));
        assert_eq!(jira.calls(), vec!["get_issue KP-2 transitions"]);
    }

    #[tokio::test]
    async fn test_get_issue_upstream_error() {
        let jira = Arc::new(FakeJira {
            fail_with: Some((404, r#"{"errorMessages":["Issue does not exist"]}"#.to_string())),
            ..Default::default()
        });
        let tool = GetIssueTool::new(jira);

        let error = tool
            .execute(json!({"issue_key": "NOPE-1"}), &mut context())
            .await
            .unwrap_err();

        assert_eq!(
            error.to_string(),
            r#"failed to get issue: {"errorMessages":["Issue does not exist"]} (endpoint: https://jira.test/get_issue NOPE-1 transitions)"#
        );
    }

    #[tokio::test]
    async fn test_create_issue() {
        let jira = Arc::new(FakeJira {
            created: CreatedIssue {
                id: "10010".to_string(),
                key: "KP-10".to_string(),
                self_link: "https://example.atlassian.net/rest/api/2/issue/10010".to_string(),
            },
            ..Default::default()
        });
        let tool = CreateIssueTool::new(jira.clone());

        let result = tool
            .execute(
                json!({
                    "project_key": "KP",
                    "summary": "New bug",
                    "description": "Steps",
                    "issue_type": "Bug"
                }),
                &mut context(),
            )
            .await
            .unwrap();

        assert_eq!(
            result.text_content(),
            "Issue created successfully!\nKey: KP-10\nID: 10010\nURL: https://example.atlassian.net/rest/api/2/issue/10010"
        );
        assert_eq!(
            jira.last_payload().unwrap(),
            json!({"fields": {
                "summary": "New bug",
                "description": "Steps",
                "project": {"key": "KP"},
                "issuetype": {"name": "Bug"}
            }})
        );
    }

    #[tokio::test]
    async fn test_create_issue_reports_first_missing_argument() {
        let jira = Arc::new(FakeJira::default());
        let tool = CreateIssueTool::new(jira.clone());

        let error = tool
            .execute(json!({"project_key": "KP", "summary": "x"}), &mut context())
            .await
            .unwrap_err();

        assert_eq!(error.to_string(), "description argument is required");
        assert!(jira.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_issue_skips_empty_fields() {
        let jira = Arc::new(FakeJira::default());
        let tool = UpdateIssueTool::new(jira.clone());

        let result = tool
            .execute(
                json!({"issue_key": "KP-2", "summary": "Renamed", "description": ""}),
                &mut context(),
            )
            .await
            .unwrap();

        assert_eq!(result.text_content(), "Issue updated successfully!");
        assert_eq!(jira.calls(), vec!["update_issue KP-2 true"]);
        assert_eq!(
            jira.last_payload().unwrap(),
            json!({"fields": {"summary": "Renamed"}})
        );
    }
}
