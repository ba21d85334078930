//! Jira tool catalog.
//!
//! Each tool validates its arguments, makes one call through the injected
//! [`JiraApi`] / [`AgileApi`] client and renders the answer as plain text.
//! Mutating tools declare [`Permission::Write`] and are left out of the
//! registry entirely in read-only mode.

pub mod comment;
pub mod issue;
pub mod search;
pub mod sprint;
pub mod status;
pub mod transition;
pub mod worklog;

pub use self::{
    comment::{AddCommentTool, GetCommentsTool},
    issue::{CreateIssueTool, GetIssueTool, UpdateIssueTool},
    search::SearchIssueTool,
    sprint::ListSprintsTool,
    status::ListStatusesTool,
    transition::TransitionIssueTool,
    worklog::{parse_time_spent, AddWorklogTool},
};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Credentials;
use crate::jira::{
    AgileApi, AgileClient, JiraApi, JiraClient, JiraClientConfig, JiraError, JiraResult,
    RestClient,
};
use crate::mcp::errors::MCPResult;
use crate::mcp::tools::{MCPTool, ToolError, ToolRegistry};

/// Local bound for search, sprint listing and transitions, independent of
/// the server-level tool timeout
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(4);

/// Upstream clients shared by every tool
#[derive(Clone)]
pub struct JiraClients {
    pub jira: Arc<dyn JiraApi>,
    pub agile: Arc<dyn AgileApi>,
}

impl JiraClients {
    pub fn new(jira: Arc<dyn JiraApi>, agile: Arc<dyn AgileApi>) -> Self {
        Self { jira, agile }
    }

    /// Build both REST clients against the configured host
    pub fn connect(credentials: &Credentials, config: &JiraClientConfig) -> JiraResult<Self> {
        let rest = RestClient::new(credentials, config)?;
        info!("Using Jira host {}", rest.base_url());

        Ok(Self::new(
            Arc::new(JiraClient::from_rest(rest.clone())),
            Arc::new(AgileClient::from_rest(rest)),
        ))
    }
}

/// Every Jira tool, mutating ones included
pub fn jira_tools(clients: &JiraClients) -> Vec<Arc<dyn MCPTool>> {
    vec![
        Arc::new(GetIssueTool::new(clients.jira.clone())),
        Arc::new(CreateIssueTool::new(clients.jira.clone())),
        Arc::new(UpdateIssueTool::new(clients.jira.clone())),
        Arc::new(SearchIssueTool::new(clients.jira.clone())),
        Arc::new(GetCommentsTool::new(clients.jira.clone())),
        Arc::new(AddCommentTool::new(clients.jira.clone())),
        Arc::new(AddWorklogTool::new(clients.jira.clone())),
        Arc::new(TransitionIssueTool::new(clients.jira.clone())),
        Arc::new(ListSprintsTool::new(clients.agile.clone())),
        Arc::new(ListStatusesTool::new(clients.jira.clone())),
    ]
}

/// Register the Jira tools, skipping mutating ones when `read_only` is set.
/// Returns the number of tools registered.
pub async fn register_jira_tools(
    registry: &ToolRegistry,
    clients: &JiraClients,
    read_only: bool,
) -> MCPResult<usize> {
    let mut registered = 0;

    for tool in jira_tools(clients) {
        if read_only && tool.is_mutating() {
            debug!("Read-only mode, not registering {}", tool.name());
            continue;
        }
        registry.register_tool(tool).await?;
        registered += 1;
    }

    Ok(registered)
}

/// Apply [`UPSTREAM_TIMEOUT`] to an upstream call
pub(crate) async fn with_upstream_timeout<T, F>(call: F) -> JiraResult<T>
where
    F: Future<Output = JiraResult<T>>,
{
    match tokio::time::timeout(UPSTREAM_TIMEOUT, call).await {
        Ok(result) => result,
        Err(_) => Err(JiraError::Timeout(UPSTREAM_TIMEOUT)),
    }
}

/// Map an upstream failure into a tool error under `context`
pub(crate) fn upstream(context: &'static str) -> impl Fn(JiraError) -> ToolError {
    move |error| ToolError::Upstream(error.describe(context))
}


#[cfg(test)]
mod tests {
    use super::fake::{FakeAgile, FakeJira};
    use super::*;
    use crate::mcp::tools::{ExecutionContext, Permission};
    use serde_json::{json, Value};

    fn clients() -> (Arc<FakeJira>, Arc<FakeAgile>, JiraClients) {
        let jira = Arc::new(FakeJira::default());
        let agile = Arc::new(FakeAgile::default());
        let clients = JiraClients::new(jira.clone(), agile.clone());
        (jira, agile, clients)
    }

    #[tokio::test]
    async fn test_missing_required_argument_makes_no_upstream_call() {
        let (jira, agile, clients) = clients();

        for tool in jira_tools(&clients) {
            let schema = tool.input_schema();
            let required = schema["required"][0].as_str().unwrap().to_string();

            let mut context = ExecutionContext::new("test", json!(1));
            let error = tool.execute(json!({}), &mut context).await.unwrap_err();

            assert!(
                matches!(error, ToolError::InvalidParams(_)),
                "{} returned {:?}",
                tool.name(),
                error
            );
            assert!(
                error.to_string().contains(&required),
                "{}: '{}' does not mention {}",
                tool.name(),
                error,
                required
            );
        }

        assert!(jira.calls().is_empty());
        assert!(agile.calls().is_empty());
    }

    #[tokio::test]
    async fn test_read_only_gate() {
        let (_, _, clients) = clients();

        let registry = ToolRegistry::new();
        assert_eq!(register_jira_tools(&registry, &clients, false).await.unwrap(), 10);

        let registry = ToolRegistry::new();
        assert_eq!(register_jira_tools(&registry, &clients, true).await.unwrap(), 6);

        for gated in [
            "jira_create_issue",
            "jira_update_issue",
            "jira_add_worklog",
            "jira_add_comment",
        ] {
            assert!(!registry.contains(gated).await, "{} should be gated", gated);
        }
        for kept in [
            "jira_get_issue",
            "jira_search_issue",
            "jira_get_comments",
            "jira_transition_issue",
            "jira_list_sprints",
            "jira_list_statuses",
        ] {
            assert!(registry.contains(kept).await, "{} should be registered", kept);
        }
    }

    #[test]
    fn test_tool_catalog() {
        let (_, _, clients) = clients();
        let tools = jira_tools(&clients);

        for tool in &tools {
            let schema: Value = tool.input_schema();
            assert_eq!(schema["type"], "object", "{}", tool.name());
            assert!(tool.name().starts_with("jira_"));
            assert!(!tool.description().is_empty());
        }

        let writers: Vec<&str> = tools
            .iter()
            .filter(|tool| tool.required_permissions().contains(&Permission::Write))
            .map(|tool| tool.name())
            .collect();
        assert_eq!(
            writers,
            vec![
                "jira_create_issue",
                "jira_update_issue",
                "jira_add_comment",
                "jira_add_worklog"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_upstream_timeout() {
        let result: JiraResult<()> = with_upstream_timeout(async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(JiraError::Timeout(d)) if d == UPSTREAM_TIMEOUT));
    }
}
