use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt::Write;
use std::sync::Arc;
use tracing::debug;

use crate::jira::models::Issue;
use crate::jira::JiraApi;
use crate::mcp::tools::jira::{upstream, with_upstream_timeout};
use crate::mcp::tools::{required_str, ExecutionContext, MCPTool, ToolError, ToolResult};

const MAX_RESULTS: u32 = 30;

/// Run a JQL query and summarize the matching issues
pub struct SearchIssueTool {
    jira: Arc<dyn JiraApi>,
}

impl SearchIssueTool {
    pub fn new(jira: Arc<dyn JiraApi>) -> Self {
        Self { jira }
    }
}

#[async_trait]
impl MCPTool for SearchIssueTool {
    fn name(&self) -> &str {
        "jira_search_issue"
    }

    fn description(&self) -> &str {
        "Search for Jira issues using JQL (Jira Query Language). Returns key details like summary, status, assignee, and priority for matching issues"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "jql": {
                    "type": "string",
                    "description": "JQL query string (e.g., 'project = KP AND status = \"In Progress\"')"
                }
            },
            "required": ["jql"]
        })
    }

    async fn execute(
        &self,
        params: Value,
        _context: &mut ExecutionContext,
    ) -> Result<ToolResult, ToolError> {
        let jql = required_str(&params, "jql")?;

        let result = with_upstream_timeout(self.jira.search_issues(jql, 0, MAX_RESULTS))
            .await
            .map_err(upstream("failed to search issues"))?;

        debug!("JQL '{}' matched {} issues", jql, result.total);

        if result.issues.is_empty() {
            return Ok(ToolResult::text(
                "No issues found matching the search criteria.",
            ));
        }

        let text = result
            .issues
            .iter()
            .take(MAX_RESULTS as usize)
            .map(format_summary)
            .collect::<String>();

        Ok(ToolResult::text(text))
    }
}

/// One search hit; absent or empty fields are skipped
fn format_summary(issue: &Issue) -> String {
    let fields = &issue.fields;
    let mut out = format!("Key: {}\n", issue.key);

    if !fields.summary.is_empty() {
        let _ = writeln!(out, "Summary: {}", fields.summary);
    }
    if let Some(status) = fields.status.as_ref().filter(|s| !s.name.is_empty()) {
        let _ = writeln!(out, "Status: {}", status.name);
    }
    if let Some(created) = fields.created.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(out, "Created: {}", created);
    }
    if let Some(updated) = fields.updated.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(out, "Updated: {}", updated);
    }

    let _ = writeln!(
        out,
        "Assignee: {}",
        fields
            .assignee
            .as_ref()
            .map(|user| user.display_name.as_str())
            .unwrap_or("Unassigned")
    );
    let _ = writeln!(
        out,
        "Priority: {}",
        fields
            .priority
            .as_ref()
            .map(|priority| priority.name.as_str())
            .unwrap_or("Unset")
    );

    if let Some(resolved) = fields.resolutiondate.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(out, "Resolution date: {}", resolved);
    }

    out.push('\n');
    out
}
