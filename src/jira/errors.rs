use std::time::Duration;

pub type JiraResult<T> = Result<T, JiraError>;

/// Errors raised while talking to the Jira REST API
#[derive(Debug, thiserror::Error)]
pub enum JiraError {
    /// The server answered with a non-success status
    #[error("HTTP {status} from {endpoint}: {body}")]
    Api {
        status: u16,
        endpoint: String,
        body: String,
    },

    #[error("{0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("invalid host '{host}': {reason}")]
    InvalidHost { host: String, reason: String },
}

impl JiraError {
    /// Raw response body and endpoint, when the server produced a response
    pub fn response(&self) -> Option<(&str, &str)> {
        match self {
            JiraError::Api { body, endpoint, .. } => Some((body.as_str(), endpoint.as_str())),
            _ => None,
        }
    }

    /// Render the error behind a context prefix, quoting the raw response
    /// body and endpoint when one is available
    pub fn describe(&self, context: &str) -> String {
        match self.response() {
            Some((body, endpoint)) => format!("{}: {} (endpoint: {})", context, body, endpoint),
            None => format!("{}: {}", context, self),
        }
    }
}
