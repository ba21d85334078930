use async_trait::async_trait;
use reqwest::Url;

use crate::config::Credentials;
use crate::jira::{
    client::{JiraClientConfig, RestClient},
    errors::JiraResult,
    models::{SprintPage, SprintState},
    AgileApi,
};

const AGILE_PREFIX: [&str; 3] = ["rest", "agile", "1.0"];

/// Client for the board and sprint REST surface (`/rest/agile/1.0`)
#[derive(Clone)]
pub struct AgileClient {
    rest: RestClient,
}

impl AgileClient {
    pub fn new(credentials: &Credentials, config: &JiraClientConfig) -> JiraResult<Self> {
        Ok(Self::from_rest(RestClient::new(credentials, config)?))
    }

    pub fn from_rest(rest: RestClient) -> Self {
        Self { rest }
    }

    fn api(&self, path: &[&str], query: &[(&str, String)]) -> JiraResult<Url> {
        let segments: Vec<&str> = AGILE_PREFIX.iter().chain(path.iter()).copied().collect();
        self.rest.endpoint(&segments, query)
    }
}

#[async_trait]
impl AgileApi for AgileClient {
    async fn board_sprints(
        &self,
        board_id: u64,
        start_at: u32,
        max_results: u32,
        states: &[SprintState],
    ) -> JiraResult<SprintPage> {
        let board = board_id.to_string();
        let mut query = vec![
            ("startAt", start_at.to_string()),
            ("maxResults", max_results.to_string()),
        ];
        if !states.is_empty() {
            let states: Vec<&str> = states.iter().map(SprintState::as_str).collect();
            query.push(("state", states.join(",")));
        }

        let url = self.api(&["board", &board, "sprint"], &query)?;
        self.rest.get(url).await
    }
}
