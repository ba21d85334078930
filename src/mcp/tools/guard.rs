//! Per-invocation fault barrier.
//!
//! Every tool call runs inside [`guarded`]: returned errors become an
//! `Error: ...` text result, panics become a `Panic: ...` text result with the
//! stack trace of the panicking thread, and the call is bounded by the server's
//! tool timeout. Callers always receive a well-formed [`ToolResult`].

use futures::FutureExt;
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Once;
use std::time::Duration;
use tracing::{error, warn};

use crate::mcp::tools::{ToolError, ToolResult};

static PANIC_HOOK: Once = Once::new();

thread_local! {
    static LAST_PANIC_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Chain a hook that records the backtrace of each panic on the panicking
/// thread, where the unwinding future is polled.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let trace = Backtrace::force_capture().to_string();
            let _ = LAST_PANIC_TRACE.try_with(|slot| *slot.borrow_mut() = Some(trace));
            previous(info);
        }));
    });
}

fn take_panic_trace() -> String {
    LAST_PANIC_TRACE
        .try_with(|slot| slot.borrow_mut().take())
        .ok()
        .flatten()
        .filter(|trace| !trace.trim().is_empty())
        .unwrap_or_else(|| Backtrace::force_capture().to_string())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run a tool future, converting every failure into a text result
pub async fn guarded<F>(tool_name: &str, timeout: Duration, future: F) -> ToolResult
where
    F: Future<Output = Result<ToolResult, ToolError>>,
{
    install_panic_hook();

    let bounded = async {
        match tokio::time::timeout(timeout, future).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    };

    match AssertUnwindSafe(bounded).catch_unwind().await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            warn!("Tool {} failed: {}", tool_name, e);
            ToolResult::text(format!("Error: {}", e))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            let trace = take_panic_trace();
            error!("Tool {} panicked: {}\n{}", tool_name, message, trace);
            ToolResult::text(format!("Panic: {}\nStack trace:\n{}", message, trace))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn explode() -> Result<ToolResult, ToolError> {
        panic!("upstream returned nonsense")
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let result = guarded("ok", Duration::from_secs(5), async {
            Ok(ToolResult::text("fine"))
        })
        .await;
        assert_eq!(result.text_content(), "fine");
    }

    #[tokio::test]
    async fn test_error_becomes_text() {
        let result = guarded("bad", Duration::from_secs(5), async {
            Err(ToolError::InvalidParams("issue_key argument is required".to_string()))
        })
        .await;
        assert_eq!(result.text_content(), "Error: issue_key argument is required");
    }

    #[tokio::test]
    async fn test_panic_becomes_text_with_trace() {
        let result = guarded("boom", Duration::from_secs(5), explode()).await;
        let text = result.text_content();

        assert!(text.starts_with("Panic: upstream returned nonsense\nStack trace:\n"));
        let trace = text.split("Stack trace:\n").nth(1).unwrap_or_default();
        assert!(!trace.trim().is_empty());

        // The guard keeps working after a panic.
        let result = guarded("ok", Duration::from_secs(5), async {
            Ok(ToolResult::text("still serving"))
        })
        .await;
        assert_eq!(result.text_content(), "still serving");
    }

    #[tokio::test]
    async fn test_timeout_becomes_text() {
        let result = guarded("slow", Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ToolResult::text("too late"))
        })
        .await;
        assert_eq!(
            result.text_content(),
            "Error: Timeout: tool execution exceeded 20ms"
        );
    }
}
