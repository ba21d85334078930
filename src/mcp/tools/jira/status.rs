use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt::Write;
use std::sync::Arc;

use crate::jira::JiraApi;
use crate::mcp::tools::jira::upstream;
use crate::mcp::tools::{required_str, ExecutionContext, MCPTool, ToolError, ToolResult};

/// Statuses per issue type of a project
pub struct ListStatusesTool {
    jira: Arc<dyn JiraApi>,
}

impl ListStatusesTool {
    pub fn new(jira: Arc<dyn JiraApi>) -> Self {
        Self { jira }
    }
}

#[async_trait]
impl MCPTool for ListStatusesTool {
    fn name(&self) -> &str {
        "jira_list_statuses"
    }

    fn description(&self) -> &str {
        "Retrieve all available issue status IDs and their names for a specific Jira project"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "project_key": {
                    "type": "string",
                    "description": "Project identifier (e.g., KP, PROJ)"
                }
            },
            "required": ["project_key"]
        })
    }

    async fn execute(
        &self,
        params: Value,
        _context: &mut ExecutionContext,
    ) -> Result<ToolResult, ToolError> {
        let project_key = required_str(&params, "project_key")?;

        let issue_types = self
            .jira
            .project_statuses(project_key)
            .await
            .map_err(upstream("failed to get statuses"))?;

        if issue_types.is_empty() {
            return Ok(ToolResult::text("No issue types found for this project."));
        }

        let mut text = String::from("Available Statuses:\n");
        for issue_type in &issue_types {
            let _ = write!(text, "\nIssue Type: {}\n", issue_type.name);
            for status in &issue_type.statuses {
                let _ = writeln!(text, "  - {}: {}", status.name, status.id);
            }
        }

        Ok(ToolResult::text(text))
    }
}
