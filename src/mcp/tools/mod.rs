//! MCP tools: the tool trait, result types, argument helpers, the registry
//! that dispatches calls, and the Jira tool catalog.

pub mod guard;
pub mod jira;
pub mod registry;

pub use self::registry::{ToolInfo, ToolRegistry, ToolRegistryConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Core trait that all MCP tools must implement
#[async_trait]
pub trait MCPTool: Send + Sync {
    /// Get the tool name (unique identifier)
    fn name(&self) -> &str;

    /// Get the tool description for documentation
    fn description(&self) -> &str;

    /// Get the JSON schema for input parameters
    fn input_schema(&self) -> Value;

    /// Execute the tool with given parameters and context
    async fn execute(
        &self,
        params: Value,
        context: &mut ExecutionContext,
    ) -> Result<ToolResult, ToolError>;

    /// Get required permissions for this tool
    fn required_permissions(&self) -> Vec<Permission> {
        vec![Permission::Read]
    }

    /// Whether the tool changes upstream state
    fn is_mutating(&self) -> bool {
        self.required_permissions().contains(&Permission::Write)
    }
}

/// Per-invocation information handed to a tool
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub connection_id: String,
    pub request_id: Value,
}

impl ExecutionContext {
    pub fn new(connection_id: impl Into<String>, request_id: Value) -> Self {
        Self {
            connection_id: connection_id.into(),
            request_id,
        }
    }
}

/// Tool execution result, serialized as MCP `CallToolResult`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: Vec<Content>,
}

impl ToolResult {
    /// A result carrying a single text block
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
        }
    }

    /// All text blocks joined together
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .map(|content| match content {
                Content::Text { text } => text.as_str(),
            })
            .collect()
    }
}

/// Content types that tools can return
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Content {
    #[serde(rename = "text")]
    Text { text: String },
}

/// Tool error types
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Missing or malformed argument; no upstream call was made
    #[error("{0}")]
    InvalidParams(String),

    /// Upstream Jira failure, already rendered with its context
    #[error("{0}")]
    Upstream(String),

    #[error("Timeout: tool execution exceeded {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// Permission types for tool access control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// Read issues, comments, sprints and project metadata
    Read,
    /// Create or modify upstream data
    Write,
}

/// Fetch a required string argument
pub fn required_str<'a>(params: &'a Value, name: &str) -> Result<&'a str, ToolError> {
    params
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidParams(format!("{} argument is required", name)))
}

/// Fetch an optional string argument
pub fn optional_str<'a>(params: &'a Value, name: &str) -> Option<&'a str> {
    params.get(name).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_result_shape() {
        let result = ToolResult::text("hello");
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"content": [{"type": "text", "text": "hello"}]})
        );
        assert_eq!(result.text_content(), "hello");
    }

    #[test]
    fn test_argument_helpers() {
        let params = json!({"issue_key": "KP-1", "count": 3});

        assert_eq!(required_str(&params, "issue_key").unwrap(), "KP-1");
        assert_eq!(
            required_str(&params, "count").unwrap_err().to_string(),
            "count argument is required"
        );
        assert_eq!(
            required_str(&params, "jql").unwrap_err().to_string(),
            "jql argument is required"
        );
        assert_eq!(optional_str(&params, "comment"), None);
    }
}
