use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt::Write;
use std::sync::Arc;

use crate::jira::models::SprintState;
use crate::jira::AgileApi;
use crate::mcp::tools::jira::{upstream, with_upstream_timeout};
use crate::mcp::tools::{required_str, ExecutionContext, MCPTool, ToolError, ToolResult};

const MAX_SPRINTS: u32 = 50;

/// Active and future sprints of a board
pub struct ListSprintsTool {
    agile: Arc<dyn AgileApi>,
}

impl ListSprintsTool {
    pub fn new(agile: Arc<dyn AgileApi>) -> Self {
        Self { agile }
    }
}

#[async_trait]
impl MCPTool for ListSprintsTool {
    fn name(&self) -> &str {
        "jira_list_sprints"
    }

    fn description(&self) -> &str {
        "List all active and future sprints for a specific Jira board, including sprint IDs, names, states, and dates"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "board_id": {
                    "type": "string",
                    "description": "Numeric ID of the Jira board (can be found in board URL)"
                }
            },
            "required": ["board_id"]
        })
    }

    async fn execute(
        &self,
        params: Value,
        _context: &mut ExecutionContext,
    ) -> Result<ToolResult, ToolError> {
        let board_id = required_str(&params, "board_id")?;
        let board_id: u64 = board_id
            .trim()
            .parse()
            .map_err(|e| ToolError::InvalidParams(format!("invalid board_id: {}", e)))?;

        let page = with_upstream_timeout(self.agile.board_sprints(
            board_id,
            0,
            MAX_SPRINTS,
            &[SprintState::Active, SprintState::Future],
        ))
        .await
        .map_err(upstream("failed to get sprints"))?;

        if page.values.is_empty() {
            return Ok(ToolResult::text("No sprints found for this board."));
        }

        let mut text = String::new();
        for sprint in &page.values {
            let _ = write!(
                text,
                "ID: {}\nName: {}\nState: {}\nStartDate: {}\nEndDate: {}\n\n",
                sprint.id,
                sprint.name,
                sprint.state,
                sprint.start_date.as_deref().unwrap_or_default(),
                sprint.end_date.as_deref().unwrap_or_default()
            );
        }

        Ok(ToolResult::text(text))
    }
}
