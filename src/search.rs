//! Code-search client and the query cascade policy.
//!
//! Uses reqwest against a GitHub-compatible `/search/repositories` endpoint.

use crate::config::GithubConfig;
use crate::repository::{RepositoryRecord, UpstreamRepository};
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Url};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid search URL: {0}")]
    Url(String),
    #[error("search API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode search response: {0}")]
    Decode(String),
}

/// Anything that can answer a repository search query.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Run one query, returning the mapped records in upstream order.
    ///
    /// An empty vector means the query matched nothing.
    async fn search(&self, query: &str) -> Result<Vec<RepositoryRecord>, SearchError>;
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

/// Search client for the GitHub REST API
pub struct GitHubSearch {
    client: Client,
    api_base: String,
    per_page: u32,
    token: Option<String>,
}

impl GitHubSearch {
    pub fn new(client: Client, config: &GithubConfig) -> Self {
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            per_page: config.per_page,
            token: config.token.clone(),
        }
    }

    fn search_url(&self, query: &str) -> Result<Url, SearchError> {
        let per_page = self.per_page.to_string();
        Url::parse_with_params(
            &format!("{}/search/repositories", self.api_base),
            &[
                ("q", query),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", per_page.as_str()),
            ],
        )
        .map_err(|e| SearchError::Url(e.to_string()))
    }
}

#[async_trait]
impl SearchClient for GitHubSearch {
    async fn search(&self, query: &str) -> Result<Vec<RepositoryRecord>, SearchError> {
        let url = self.search_url(query)?;
        let mut request = self.client.get(url).header(ACCEPT, GITHUB_ACCEPT);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        parse_items(&body)
    }
}

/// Map a search response body to records, skipping items that cannot be read
pub fn parse_items(body: &str) -> Result<Vec<RepositoryRecord>, SearchError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| SearchError::Decode(e.to_string()))?;

    let records = response
        .items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<UpstreamRepository>(item) {
            Ok(repo) => Some(RepositoryRecord::from(repo)),
            Err(e) => {
                warn!("Skipping unreadable search item: {}", e);
                None
            }
        })
        .collect::<Vec<_>>();

    debug!("Search response mapped to {} records", records.len());
    Ok(records)
}

/// Ordered search queries, narrowest first.
///
/// The first query only matches AI/ML repositories pushed since `today - recency_days`;
/// later entries drop constraints until something is likely to match.
pub fn cascade_queries(today: NaiveDate, recency_days: i64) -> Vec<String> {
    let days = u64::try_from(recency_days).unwrap_or(0);
    let since = today.checked_sub_days(Days::new(days)).unwrap_or(today);

    vec![
        format!(
            "pushed:>{} topic:ai topic:machine-learning",
            since.format("%Y-%m-%d")
        ),
        "topic:ai topic:machine-learning".to_string(),
        "ai language:python language:javascript".to_string(),
        "machine learning stars:>100".to_string(),
    ]
}
