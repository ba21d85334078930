use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::jira::models::{WorklogOptions, WorklogPayload};
use crate::jira::JiraApi;
use crate::mcp::tools::jira::upstream;
use crate::mcp::tools::{
    optional_str, required_str, ExecutionContext, MCPTool, Permission, ToolError, ToolResult,
};

/// Timestamp layout Jira expects for `started`
const STARTED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

lazy_static! {
    static ref DURATION_COMPONENT: Option<Regex> =
        Regex::new(r"^\s*(\d*)(?:\.(\d*))?\s*(ns|us|µs|μs|ms|s|m|h)").ok();
}

const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// Fraction digits beyond this carry no weight at nanosecond precision
const MAX_FRACTION_DIGITS: usize = 18;

/// Convert a `time_spent` argument into whole seconds.
///
/// Accepts a bare integer (seconds) or a sequence of number-unit components
/// such as `1h30m`, `1h 30m` or `1.5h`. Components are summed in nanoseconds
/// and fractions of a second are truncated once at the end.
pub fn parse_time_spent(input: &str) -> Result<u64, ToolError> {
    let trimmed = input.trim();
    if let Ok(seconds) = trimmed.parse::<u64>() {
        return Ok(seconds);
    }

    parse_components(trimmed).ok_or_else(|| {
        ToolError::InvalidParams(format!(
            "invalid time_spent format: could not parse time: {}",
            input
        ))
    })
}

fn parse_components(input: &str) -> Option<u64> {
    let pattern = DURATION_COMPONENT.as_ref()?;
    let mut rest = input;
    let mut total_nanos: u128 = 0;

    if rest.is_empty() {
        return None;
    }

    while !rest.trim().is_empty() {
        let captures = pattern.captures(rest)?;
        let whole = captures.get(1).map_or("", |m| m.as_str());
        let fraction = captures.get(2).map_or("", |m| m.as_str());
        if whole.is_empty() && fraction.is_empty() {
            return None;
        }

        let unit_nanos: u128 = match &captures[3] {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => NANOS_PER_SECOND,
            "m" => 60 * NANOS_PER_SECOND,
            "h" => 3_600 * NANOS_PER_SECOND,
            _ => return None,
        };

        let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        total_nanos = total_nanos.checked_add(whole.checked_mul(unit_nanos)?)?;

        let fraction = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
        if !fraction.is_empty() {
            let digits: u128 = fraction.parse().ok()?;
            let scale = 10u128.pow(fraction.len() as u32);
            total_nanos = total_nanos.checked_add(digits * unit_nanos / scale)?;
        }

        rest = &rest[captures.get(0)?.end()..];
    }

    u64::try_from(total_nanos / NANOS_PER_SECOND).ok()
}

/// Log time against an issue
pub struct AddWorklogTool {
    jira: Arc<dyn JiraApi>,
}

impl AddWorklogTool {
    pub fn new(jira: Arc<dyn JiraApi>) -> Self {
        Self { jira }
    }
}

#[async_trait]
impl MCPTool for AddWorklogTool {
    fn name(&self) -> &str {
        "jira_add_worklog"
    }

    fn description(&self) -> &str {
        "Add a worklog to a Jira issue to track time spent on the issue"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "issue_key": {
                    "type": "string",
                    "description": "The unique identifier of the Jira issue (e.g., KP-2, PROJ-123)"
                },
                "time_spent": {
                    "type": "string",
                    "description": "Time spent working on the issue (e.g., 3h, 30m, 1h 30m)"
                },
                "comment": {
                    "type": "string",
                    "description": "Comment describing the work done"
                },
                "started": {
                    "type": "string",
                    "description": "When the work began, in ISO 8601 format (e.g., 2023-05-01T10:00:00.000+0000). Defaults to current time."
                }
            },
            "required": ["issue_key", "time_spent"]
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
        let time_spent = required_str(&params, "time_spent")?;
        let time_spent_seconds = parse_time_spent(time_spent)?;

        let started = optional_str(&params, "started")
            .filter(|started| !started.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| chrono::Local::now().format(STARTED_FORMAT).to_string());

        let payload = WorklogPayload {
            time_spent_seconds,
            started,
            comment: optional_str(&params, "comment")
                .filter(|comment| !comment.is_empty())
                .map(str::to_string),
        };

        let worklog = self
            .jira
            .add_worklog(issue_key, &payload, &WorklogOptions::default())
            .await
            .map_err(upstream("failed to add worklog"))?;

        info!(
            "Logged {}s on {} (worklog {})",
            worklog.time_spent_seconds, issue_key, worklog.id
        );

        Ok(ToolResult::text(format!(
            "Worklog added successfully!\nIssue: {}\nWorklog ID: {}\nTime Spent: {} ({} seconds)\nDate Started: {}\nAuthor: {}",
            issue_key,
            worklog.id,
            time_spent,
            worklog.time_spent_seconds,
            worklog.started,
            worklog
                .author
                .as_ref()
                .map(|user| user.display_name.as_str())
                .unwrap_or("Unknown")
        )))
    }
}
