use async_trait::async_trait;
use reqwest::{header, Method, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::config::Credentials;
use crate::jira::{
    errors::{JiraError, JiraResult},
    models::{
        Comment, CommentPage, CreatedIssue, Issue, IssuePayload, IssueTypeStatuses, SearchResult,
        Worklog, WorklogOptions, WorklogPayload,
    },
    JiraApi,
};

const API_PREFIX: [&str; 3] = ["rest", "api", "2"];

/// Configuration shared by the REST clients
#[derive(Debug, Clone)]
pub struct JiraClientConfig {
    /// Per-request timeout applied by the HTTP client
    pub timeout: Duration,

    pub user_agent: String,
}

impl Default for JiraClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("jira-mcp/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Authenticated HTTP access to a Jira host.
///
/// Holds the base URL and basic-auth credentials; cloning is cheap and shares
/// the underlying connection pool.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
    email: String,
    token: String,
}

impl RestClient {
    pub fn new(credentials: &Credentials, config: &JiraClientConfig) -> JiraResult<Self> {
        let base_url = parse_host(&credentials.host)?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            base_url,
            email: credentials.email.clone(),
            token: credentials.token.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL by appending percent-encoded path segments to the
    /// base URL. Any path prefix of the host is kept.
    pub fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> JiraResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| JiraError::InvalidHost {
                host: self.base_url.to_string(),
                reason: "host cannot be used as a base URL".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }

    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> JiraResult<T> {
        let endpoint = url.to_string();
        let body = self.execute::<()>(Method::GET, url, None).await?;
        decode(&endpoint, &body)
    }

    pub async fn post<B, T>(&self, url: Url, payload: &B) -> JiraResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let endpoint = url.to_string();
        let body = self.execute(Method::POST, url, Some(payload)).await?;
        decode(&endpoint, &body)
    }

    /// POST where the response body, if any, is ignored
    pub async fn post_discard<B>(&self, url: Url, payload: &B) -> JiraResult<()>
    where
        B: Serialize + ?Sized + Sync,
    {
        self.execute(Method::POST, url, Some(payload)).await.map(|_| ())
    }

    /// PUT where the response body, if any, is ignored
    pub async fn put_discard<B>(&self, url: Url, payload: &B) -> JiraResult<()>
    where
        B: Serialize + ?Sized + Sync,
    {
        self.execute(Method::PUT, url, Some(payload)).await.map(|_| ())
    }

    async fn execute<B>(&self, method: Method, url: Url, payload: Option<&B>) -> JiraResult<String>
    where
        B: Serialize + ?Sized + Sync,
    {
        let endpoint = url.to_string();
        debug!("Jira request: {} {}", method, endpoint);

        let mut request = self
            .http
            .request(method, url)
            .basic_auth(&self.email, Some(&self.token))
            .header(header::ACCEPT, "application/json");

        if let Some(payload) = payload {
            request = request.json(payload);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            debug!("Jira request failed with {}: {}", status, endpoint);
            return Err(JiraError::Api {
                status: status.as_u16(),
                endpoint,
                body,
            });
        }

        Ok(body)
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: &str) -> JiraResult<T> {
    serde_json::from_str(body).map_err(|source| JiraError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

/// Normalize the configured host into a base URL ending with `/`.
/// A bare host name gets an `https://` scheme.
pub fn parse_host(host: &str) -> JiraResult<Url> {
    let invalid = |reason: String| JiraError::InvalidHost {
        host: host.to_string(),
        reason,
    };

    let trimmed = host.trim().trim_end_matches('/');
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let mut url = Url::parse(&candidate).map_err(|e| invalid(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(invalid("missing host name".to_string()));
    }

    url.set_query(None);
    url.set_fragment(None);
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// Client for the issue REST surface (`/rest/api/2`)
#[derive(Clone)]
pub struct JiraClient {
    rest: RestClient,
}

impl JiraClient {
    pub fn new(credentials: &Credentials, config: &JiraClientConfig) -> JiraResult<Self> {
        Ok(Self::from_rest(RestClient::new(credentials, config)?))
    }

    pub fn from_rest(rest: RestClient) -> Self {
        Self { rest }
    }

    fn api(&self, path: &[&str], query: &[(&str, String)]) -> JiraResult<Url> {
        let segments: Vec<&str> = API_PREFIX.iter().chain(path.iter()).copied().collect();
        self.rest.endpoint(&segments, query)
    }
}

#[async_trait]
impl JiraApi for JiraClient {
    async fn get_issue(&self, issue_key: &str, expand: &[&str]) -> JiraResult<Issue> {
        let mut query = Vec::new();
        if !expand.is_empty() {
            query.push(("expand", expand.join(",")));
        }

        let url = self.api(&["issue", issue_key], &query)?;
        self.rest.get(url).await
    }

    async fn create_issue(&self, payload: &IssuePayload) -> JiraResult<CreatedIssue> {
        let url = self.api(&["issue"], &[])?;
        self.rest.post(url, payload).await
    }

    async fn update_issue(
        &self,
        issue_key: &str,
        payload: &IssuePayload,
        notify_users: bool,
    ) -> JiraResult<()> {
        let url = self.api(
            &["issue", issue_key],
            &[("notifyUsers", notify_users.to_string())],
        )?;
        self.rest.put_discard(url, payload).await
    }

    async fn search_issues(
        &self,
        jql: &str,
        start_at: u32,
        max_results: u32,
    ) -> JiraResult<SearchResult> {
        let url = self.api(
            &["search"],
            &[
                ("jql", jql.to_string()),
                ("startAt", start_at.to_string()),
                ("maxResults", max_results.to_string()),
            ],
        )?;
        self.rest.get(url).await
    }

    async fn add_comment(&self, issue_key: &str, body: &str) -> JiraResult<Comment> {
        let url = self.api(&["issue", issue_key, "comment"], &[])?;
        self.rest.post(url, &json!({ "body": body })).await
    }

    async fn get_comments(&self, issue_key: &str) -> JiraResult<CommentPage> {
        let url = self.api(&["issue", issue_key, "comment"], &[])?;
        self.rest.get(url).await
    }

    async fn add_worklog(
        &self,
        issue_key: &str,
        payload: &WorklogPayload,
        options: &WorklogOptions,
    ) -> JiraResult<Worklog> {
        let url = self.api(
            &["issue", issue_key, "worklog"],
            &[
                ("notifyUsers", options.notify.to_string()),
                ("adjustEstimate", options.adjust_estimate.as_str().to_string()),
            ],
        )?;
        self.rest.post(url, payload).await
    }

    async fn transition_issue(&self, issue_key: &str, transition_id: &str) -> JiraResult<()> {
        let url = self.api(&["issue", issue_key, "transitions"], &[])?;
        self.rest
            .post_discard(url, &json!({ "transition": { "id": transition_id } }))
            .await
    }

    async fn project_statuses(&self, project_key: &str) -> JiraResult<Vec<IssueTypeStatuses>> {
        let url = self.api(&["project", project_key, "statuses"], &[])?;
        self.rest.get(url).await
    }
}
