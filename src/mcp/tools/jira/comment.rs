use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt::Write;
use std::sync::Arc;
use tracing::info;

use crate::jira::models::User;
use crate::jira::JiraApi;
use crate::mcp::tools::jira::upstream;
use crate::mcp::tools::{
    required_str, ExecutionContext, MCPTool, Permission, ToolError, ToolResult,
};

fn author_name(author: &Option<User>) -> &str {
    author
        .as_ref()
        .map(|user| user.display_name.as_str())
        .unwrap_or("Unknown")
}

/// Post a plain-text comment on an issue
pub struct AddCommentTool {
    jira: Arc<dyn JiraApi>,
}

impl AddCommentTool {
    pub fn new(jira: Arc<dyn JiraApi>) -> Self {
        Self { jira }
    }
}

#[async_trait]
impl MCPTool for AddCommentTool {
    fn name(&self) -> &str {
        "jira_add_comment"
    }

    fn description(&self) -> &str {
        "Add a comment to a Jira issue"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "issue_key": {
                    "type": "string",
                    "description": "The unique identifier of the Jira issue (e.g., KP-2, PROJ-123)"
                },
                "comment": {
                    "type": "string",
                    "description": "The comment text to add to the issue"
                }
            },
            "required": ["issue_key", "comment"]
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
        let body = required_str(&params, "comment")?;

        let comment = self
            .jira
            .add_comment(issue_key, body)
            .await
            .map_err(upstream("failed to add comment"))?;

        info!("Added comment {} to {}", comment.id, issue_key);
        Ok(ToolResult::text(format!(
            "Comment added successfully!\nID: {}\nAuthor: {}\nCreated: {}",
            comment.id,
            author_name(&comment.author),
            comment.created
        )))
    }
}

/// List every comment on an issue
pub struct GetCommentsTool {
    jira: Arc<dyn JiraApi>,
}

impl GetCommentsTool {
    pub fn new(jira: Arc<dyn JiraApi>) -> Self {
        Self { jira }
    }
}

#[async_trait]
impl MCPTool for GetCommentsTool {
    fn name(&self) -> &str {
        "jira_get_comments"
    }

    fn description(&self) -> &str {
        "Retrieve all comments from a Jira issue"
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

        let page = self
            .jira
            .get_comments(issue_key)
            .await
            .map_err(upstream("failed to get comments"))?;

        if page.comments.is_empty() {
            return Ok(ToolResult::text("No comments found for this issue."));
        }

        let mut text = String::new();
        for comment in &page.comments {
            let _ = write!(
                text,
                "ID: {}\nAuthor: {}\nCreated: {}\nUpdated: {}\nBody: {}\n\n",
                comment.id,
                author_name(&comment.author),
                comment.created,
                comment.updated,
                comment.body
            );
        }

        Ok(ToolResult::text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jira::models::{Comment, CommentPage};
    use crate::mcp::tools::jira::fake::FakeJira;

    fn context() -> ExecutionContext {
        ExecutionContext::new("test", json!(1))
    }

    #[tokio::test]
    async fn test_add_comment() {
        let jira = Arc::new(FakeJira {
            comment: Comment {
                id: "100".to_string(),
                author: Some(User {
                    display_name: "Ana".to_string(),
                }),
                body: "Looks good".to_string(),
                created: "2024-01-01T10:00:00.000+0000".to_string(),
                updated: String::new(),
            },
            ..Default::default()
        });
        let tool = AddCommentTool::new(jira.clone());

        let result = tool
            .execute(
                json!({"issue_key": "KP-2", "comment": "Looks good"}),
                &mut context(),
            )
            .await
            .unwrap();

        assert_eq!(
            result.text_content(),
            "Comment added successfully!\nID: 100\nAuthor: Ana\nCreated: 2024-01-01T10:00:00.000+0000"
        );
        assert_eq!(jira.calls(), vec!["add_comment KP-2"]);
        assert_eq!(jira.last_payload().unwrap(), json!("Looks good"));
    }

    #[tokio::test]
    async fn test_add_comment_requires_text() {
        let jira = Arc::new(FakeJira::default());
        let tool = AddCommentTool::new(jira.clone());

        let error = tool
            .execute(json!({"issue_key": "KP-2"}), &mut context())
            .await
            .unwrap_err();

        assert_eq!(error.to_string(), "comment argument is required");
        assert!(jira.calls().is_empty());
    }

    #[tokio::test]
    async fn test_get_comments_empty() {
        let jira = Arc::new(FakeJira::default());
        let tool = GetCommentsTool::new(jira);

        let result = tool
            .execute(json!({"issue_key": "KP-2"}), &mut context())
            .await
            .unwrap();

        assert_eq!(result.text_content(), "No comments found for this issue.");
    }

    #[tokio::test]
    async fn test_get_comments_unknown_author() {
        let jira = Arc::new(FakeJira {
            comments: CommentPage {
                total: 1,
                comments: vec![Comment {
                    id: "7".to_string(),
                    author: None,
                    body: "First".to_string(),
                    created: "c".to_string(),
                    updated: "u".to_string(),
                }],
                ..Default::default()
            },
            ..Default::default()
        });
        let tool = GetCommentsTool::new(jira);

        let result = tool
            .execute(json!({"issue_key": "KP-2"}), &mut context())
            .await
            .unwrap();

        assert_eq!(
            result.text_content(),
            "ID: 7\nAuthor: Unknown\nCreated: c\nUpdated: u\nBody: First\n\n"
        );
    }
}
