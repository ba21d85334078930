use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::jira::JiraApi;
use crate::mcp::tools::jira::{upstream, with_upstream_timeout};
use crate::mcp::tools::{optional_str, ExecutionContext, MCPTool, ToolError, ToolResult};

/// Move an issue along its workflow
pub struct TransitionIssueTool {
    jira: Arc<dyn JiraApi>,
}

impl TransitionIssueTool {
    pub fn new(jira: Arc<dyn JiraApi>) -> Self {
        Self { jira }
    }
}

/// Like `required_str`, but an empty string is rejected as well
fn non_empty_str<'a>(params: &'a Value, name: &str) -> Result<&'a str, ToolError> {
    optional_str(params, name)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ToolError::InvalidParams(format!("valid {} is required", name)))
}

#[async_trait]
impl MCPTool for TransitionIssueTool {
    fn name(&self) -> &str {
        "jira_transition_issue"
    }

    fn description(&self) -> &str {
        "Transition an issue through its workflow using a valid transition ID. Get available transitions from jira_get_issue"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "issue_key": {
                    "type": "string",
                    "description": "The issue to transition (e.g., KP-123)"
                },
                "transition_id": {
                    "type": "string",
                    "description": "Transition ID from available transitions list"
                },
                "comment": {
                    "type": "string",
                    "description": "Optional comment to add with transition"
                }
            },
            "required": ["issue_key", "transition_id"]
        })
    }

    async fn execute(
        &self,
        params: Value,
        _context: &mut ExecutionContext,
    ) -> Result<ToolResult, ToolError> {
        let issue_key = non_empty_str(&params, "issue_key")?;
        let transition_id = non_empty_str(&params, "transition_id")?;

        if optional_str(&params, "comment").is_some_and(|comment| !comment.is_empty()) {
            warn!(
                "Comment supplied for transition of {} is not attached to the issue",
                issue_key
            );
        }

        with_upstream_timeout(self.jira.transition_issue(issue_key, transition_id))
            .await
            .map_err(upstream("transition failed"))?;

        info!("Transitioned {} with transition {}", issue_key, transition_id);
        Ok(ToolResult::text("Issue transition completed successfully"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tools::jira::fake::FakeJira;

    fn context() -> ExecutionContext {
        ExecutionContext::new("test", json!(1))
    }

    #[tokio::test]
    async fn test_transition_issue() {
        let jira = Arc::new(FakeJira::default());
        let tool = TransitionIssueTool::new(jira.clone());

        let result = tool
            .execute(
                json!({"issue_key": "KP-2", "transition_id": "31", "comment": "done"}),
                &mut context(),
            )
            .await
            .unwrap();

        assert_eq!(
            result.text_content(),
            "Issue transition completed successfully"
        );
        assert_eq!(jira.calls(), vec!["transition_issue KP-2 31"]);
        assert!(jira.last_payload().is_none());
    }

    #[tokio::test]
    async fn test_transition_rejects_empty_arguments() {
        let jira = Arc::new(FakeJira::default());
        let tool = TransitionIssueTool::new(jira.clone());

        let error = tool
            .execute(json!({"issue_key": "", "transition_id": "31"}), &mut context())
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "valid issue_key is required");

        let error = tool
            .execute(json!({"issue_key": "KP-2"}), &mut context())
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "valid transition_id is required");

        assert!(jira.calls().is_empty());
    }

    #[tokio::test]
    async fn test_transition_upstream_error() {
        let jira = Arc::new(FakeJira {
            fail_with: Some((400, "Transition id '99' is not valid".to_string())),
            ..Default::default()
        });
        let tool = TransitionIssueTool::new(jira);

        let error = tool
            .execute(
                json!({"issue_key": "KP-2", "transition_id": "99"}),
                &mut context(),
            )
            .await
            .unwrap_err();

        assert_eq!(
            error.to_string(),
            "transition failed: Transition id '99' is not valid (endpoint: https://jira.test/transition_issue KP-2 99)"
        );
    }
}
