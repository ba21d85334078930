use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::mcp::errors::{MCPError, MCPResult};
use crate::mcp::tools::{guard, ExecutionContext, MCPTool, ToolError, ToolResult};

/// Tool information for MCP client discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Tool registry configuration
#[derive(Debug, Clone)]
pub struct ToolRegistryConfig {
    /// Upper bound on a single tool execution
    pub default_timeout: Duration,
}

impl Default for ToolRegistryConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(300),
        }
    }
}

/// Tool registry for managing and executing MCP tools
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn MCPTool>>>,
    config: ToolRegistryConfig,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::with_config(ToolRegistryConfig::default())
    }

    pub fn with_config(config: ToolRegistryConfig) -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Register a new tool
    pub async fn register_tool(&self, tool: Arc<dyn MCPTool>) -> MCPResult<()> {
        let name = tool.name().to_string();

        if name.is_empty() {
            return Err(MCPError::Validation("Tool name cannot be empty".to_string()));
        }
        if !tool.input_schema().is_object() {
            return Err(MCPError::Validation(format!(
                "Tool '{}' input schema must be a JSON object",
                name
            )));
        }

        let mut tools = self.tools.write().await;
        if tools.contains_key(&name) {
            return Err(MCPError::Validation(format!(
                "Tool '{}' is already registered",
                name
            )));
        }

        debug!("Registering tool: {}", name);
        tools.insert(name, tool);
        Ok(())
    }

    /// List all registered tools, ordered by name
    pub async fn list_tools(&self) -> Vec<ToolInfo> {
        let tools = self.tools.read().await;

        let mut infos: Vec<ToolInfo> = tools
            .values()
            .map(|tool| ToolInfo {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.input_schema(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.tools.read().await.contains_key(name)
    }

    pub async fn len(&self) -> usize {
        self.tools.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tools.read().await.is_empty()
    }

    /// Execute a tool by name.
    ///
    /// Only an unknown name is reported as an error; failures inside the tool
    /// are turned into text results by the guard.
    pub async fn execute_tool(
        &self,
        name: &str,
        params: Value,
        context: &mut ExecutionContext,
    ) -> Result<ToolResult, ToolError> {
        let tool = self
            .tools
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        debug!(
            "Executing tool {} (connection {}, request {})",
            name, context.connection_id, context.request_id
        );

        let start_time = Instant::now();
        let result = guard::guarded(
            name,
            self.config.default_timeout,
            tool.execute(params, context),
        )
        .await;

        debug!("Tool {} finished in {:?}", name, start_time.elapsed());
        Ok(result)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Log the registered tool set once registration is complete
pub async fn log_registered_tools(registry: &ToolRegistry) {
    let names: Vec<String> = registry
        .list_tools()
        .await
        .into_iter()
        .map(|info| info.name)
        .collect();
    info!("Registered {} tools: {}", names.len(), names.join(", "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tools::Permission;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl MCPTool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo a message"
        }

        fn input_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {
                    "message": { "type": "string" }
                },
                "required": ["message"]
            })
        }

        async fn execute(
            &self,
            params: Value,
            _context: &mut ExecutionContext,
        ) -> Result<ToolResult, ToolError> {
            let message = crate::mcp::tools::required_str(&params, "message")?;
            Ok(ToolResult::text(message))
        }
    }

    struct WriterTool;

    #[async_trait]
    impl MCPTool for WriterTool {
        fn name(&self) -> &str {
            "another"
        }

        fn description(&self) -> &str {
            "Mutates things"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        fn required_permissions(&self) -> Vec<Permission> {
            vec![Permission::Write]
        }

        async fn execute(
            &self,
            _params: Value,
            _context: &mut ExecutionContext,
        ) -> Result<ToolResult, ToolError> {
            Ok(ToolResult::text("done"))
        }
    }

    fn context() -> ExecutionContext {
        ExecutionContext::new("test", json!(1))
    }

    #[tokio::test]
    async fn test_tool_registration() {
        let registry = ToolRegistry::new();
        registry.register_tool(Arc::new(EchoTool)).await.unwrap();
        registry.register_tool(Arc::new(WriterTool)).await.unwrap();

        let tools = registry.list_tools().await;
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name, "another");
        assert_eq!(tools[1].name, "echo");
        assert!(WriterTool.is_mutating());
        assert!(!EchoTool.is_mutating());
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let registry = ToolRegistry::new();
        registry.register_tool(Arc::new(EchoTool)).await.unwrap();
        assert!(registry.register_tool(Arc::new(EchoTool)).await.is_err());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_execute_tool() {
        let registry = ToolRegistry::new();
        registry.register_tool(Arc::new(EchoTool)).await.unwrap();

        let result = registry
            .execute_tool("echo", json!({"message": "hi"}), &mut context())
            .await
            .unwrap();
        assert_eq!(result.text_content(), "hi");

        let result = registry
            .execute_tool("echo", json!({}), &mut context())
            .await
            .unwrap();
        assert_eq!(result.text_content(), "Error: message argument is required");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let error = registry
            .execute_tool("missing", json!({}), &mut context())
            .await
            .unwrap_err();
        assert!(matches!(error, ToolError::NotFound(name) if name == "missing"));
    }
}
