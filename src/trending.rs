//! Trending repository fetch.
//!
//! Serves the cached list while it is fresh, otherwise walks the query cascade
//! until one query returns results.

use crate::cache::RepositoryCache;
use crate::repository::{dedup_by_id, RepositoryRecord};
use crate::search::{cascade_queries, SearchClient, SearchError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum TrendingError {
    #[error("{0}")]
    Search(#[from] SearchError),
    #[error("No repositories found with any search query")]
    NoResults,
}

pub struct TrendingService {
    client: Arc<dyn SearchClient>,
    cache: RepositoryCache,
    recency_days: i64,
}

impl TrendingService {
    pub fn new(client: Arc<dyn SearchClient>, cache: RepositoryCache, recency_days: i64) -> Self {
        Self {
            client,
            cache,
            recency_days,
        }
    }

    /// Fetch the trending list, reusing the cached one while it is fresh.
    ///
    /// Query failures and empty results move on to the next query. Only when every
    /// query has been tried does the most recent failure surface.
    pub async fn fetch_trending(&self) -> Result<Vec<RepositoryRecord>, TrendingError> {
        if let Some(records) = self.cache.fresh().await {
            debug!("Serving {} cached repositories", records.len());
            return Ok(records);
        }

        let mut last_error = None;
        for query in cascade_queries(self.cache.today(), self.recency_days) {
            match self.client.search(&query).await {
                Ok(records) if records.is_empty() => {
                    info!("Search query {:?} returned no repositories", query);
                }
                Ok(records) => {
                    let unique = dedup_by_id(records);
                    info!(
                        "Search query {:?} returned {} repositories",
                        query,
                        unique.len()
                    );
                    self.cache.store(unique.clone()).await;
                    return Ok(unique);
                }
                Err(e) => {
                    warn!("Search query {:?} failed: {}", query, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.map_or(TrendingError::NoResults, TrendingError::Search))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::ManualClock;
    use crate::repository::DEFAULT_DESCRIPTION;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted results in order and records the queries it saw
    struct ScriptedSearch {
        responses: Mutex<VecDeque<Result<Vec<RepositoryRecord>, SearchError>>>,
        queries: Mutex<Vec<String>>,
    }

    impl ScriptedSearch {
        fn new(responses: Vec<Result<Vec<RepositoryRecord>, SearchError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                queries: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.queries.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SearchClient for ScriptedSearch {
        async fn search(&self, query: &str) -> Result<Vec<RepositoryRecord>, SearchError> {
            self.queries.lock().unwrap().push(query.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn record(id: u64, name: &str) -> RepositoryRecord {
        RepositoryRecord {
            id,
            name: name.to_string(),
            full_name: format!("owner/{name}"),
            description: DEFAULT_DESCRIPTION.to_string(),
            url: format!("https://github.com/owner/{name}"),
            stars: 10,
            language: Some("Python".to_string()),
            created_at: None,
            updated_at: None,
        }
    }

    fn status_error(status: u16) -> SearchError {
        SearchError::Status {
            status,
            body: "rate limited".to_string(),
        }
    }

    fn service(client: Arc<ScriptedSearch>, clock: Arc<ManualClock>) -> TrendingService {
        let cache = RepositoryCache::new(std::time::Duration::from_secs(300), clock);
        TrendingService::new(client, cache, 7)
    }

    #[tokio::test]
    async fn falls_through_errors_and_empty_results() {
        let client = ScriptedSearch::new(vec![
            Err(status_error(403)),
            Ok(Vec::new()),
            Ok(vec![record(1, "a"), record(2, "b")]),
        ]);
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let trending = service(client.clone(), clock);

        let records = trending.fetch_trending().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn narrow_query_is_tried_first() {
        let client = ScriptedSearch::new(vec![Ok(vec![record(1, "a")])]);
        let trending = service(client.clone(), Arc::new(ManualClock::new(Utc::now())));

        trending.fetch_trending().await.unwrap();
        let queries = client.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert!(queries[0].starts_with("pushed:>"));
    }

    #[tokio::test]
    async fn duplicate_ids_are_removed() {
        let mut dup = record(1, "dup");
        dup.stars = 500;
        let client = ScriptedSearch::new(vec![Ok(vec![record(1, "a"), record(2, "b"), dup])]);
        let trending = service(client, Arc::new(ManualClock::new(Utc::now())));

        let records = trending.fetch_trending().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "a");
        assert_eq!(records[0].stars, 10);
    }

    #[tokio::test]
    async fn all_empty_reports_no_results() {
        let client = ScriptedSearch::new((0..4).map(|_| Ok(Vec::new())).collect());
        let trending = service(client.clone(), Arc::new(ManualClock::new(Utc::now())));

        let err = trending.fetch_trending().await.unwrap_err();
        assert!(matches!(err, TrendingError::NoResults));
        assert_eq!(err.to_string(), "No repositories found with any search query");
        assert_eq!(client.calls(), 4);
    }

    #[tokio::test]
    async fn exhaustion_surfaces_most_recent_error() {
        let client = ScriptedSearch::new(vec![
            Err(status_error(500)),
            Ok(Vec::new()),
            Err(status_error(422)),
            Ok(Vec::new()),
        ]);
        let trending = service(client, Arc::new(ManualClock::new(Utc::now())));

        match trending.fetch_trending().await.unwrap_err() {
            TrendingError::Search(SearchError::Status { status, .. }) => assert_eq!(status, 422),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn status_only_failures_are_not_reported_as_empty() {
        let client = ScriptedSearch::new((0..4).map(|i| Err(status_error(500 + i))).collect());
        let trending = service(client.clone(), Arc::new(ManualClock::new(Utc::now())));

        let err = trending.fetch_trending().await.unwrap_err();
        assert!(!matches!(err, TrendingError::NoResults));
        match err {
            TrendingError::Search(SearchError::Status { status, .. }) => assert_eq!(status, 503),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(client.calls(), 4);
    }

    #[tokio::test]
    async fn cached_list_is_reused_within_window() {
        let records: Vec<RepositoryRecord> =
            (1..=5).map(|id| record(id, &format!("r{id}"))).collect();
        let client = ScriptedSearch::new(vec![Ok(records.clone()), Ok(vec![record(9, "new")])]);
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let trending = service(client.clone(), clock.clone());

        let first = trending.fetch_trending().await.unwrap();
        clock.advance(Duration::minutes(4));
        let second = trending.fetch_trending().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(client.calls(), 1);

        clock.advance(Duration::minutes(2));
        let third = trending.fetch_trending().await.unwrap();
        assert_eq!(client.calls(), 2);
        assert_eq!(third, vec![record(9, "new")]);
    }

    #[tokio::test]
    async fn failed_refresh_does_not_poison_cache() {
        let client = ScriptedSearch::new((0..4).map(|_| Ok(Vec::new())).collect());
        let trending = service(client.clone(), Arc::new(ManualClock::new(Utc::now())));

        assert!(trending.fetch_trending().await.is_err());
        // Nothing was stored, so the next call goes upstream again
        assert!(trending.fetch_trending().await.is_err());
        assert_eq!(client.calls(), 8);
    }
}
