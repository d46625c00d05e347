//! Single-slot, time-boxed cache for the trending list.

use crate::repository::RepositoryRecord;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Source of the current time, swappable in tests
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The last successful fetch and when it happened
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub records: Vec<RepositoryRecord>,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    /// An entry may be reused while its age is within `ttl`
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.fetched_at) <= ttl
    }
}

/// Process-wide cache holding at most one `CacheEntry`.
///
/// Concurrent refreshes are not coalesced: two callers that both see a stale
/// entry will both go upstream and the last `store` wins.
pub struct RepositoryCache {
    slot: RwLock<Option<CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl RepositoryCache {
    pub fn new(ttl: std::time::Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            slot: RwLock::new(None),
            ttl: Duration::from_std(ttl).unwrap_or(Duration::MAX),
            clock,
        }
    }

    /// Records of the current entry, if one exists and is still fresh
    pub async fn fresh(&self) -> Option<Vec<RepositoryRecord>> {
        let now = self.clock.now();
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .map(|entry| entry.records.clone())
    }

    /// Replace the entry with `records`, stamped with the current time
    pub async fn store(&self, records: Vec<RepositoryRecord>) {
        let entry = CacheEntry {
            records,
            fetched_at: self.clock.now(),
        };
        *self.slot.write().await = Some(entry);
    }

    /// Today's date according to the cache clock
    pub fn today(&self) -> chrono::NaiveDate {
        self.clock.now().date_naive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Manually advanced clock
    pub(crate) struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        pub(crate) fn new(start: DateTime<Utc>) -> Self {
            Self(Mutex::new(start))
        }

        pub(crate) fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn records(n: u64) -> Vec<RepositoryRecord> {
        (1..=n)
            .map(|id| RepositoryRecord {
                id,
                name: format!("repo-{id}"),
                full_name: format!("owner/repo-{id}"),
                description: "d".to_string(),
                url: String::new(),
                stars: id,
                language: None,
                created_at: None,
                updated_at: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn empty_cache_is_not_fresh() {
        let cache =
            RepositoryCache::new(std::time::Duration::from_secs(300), Arc::new(SystemClock));
        assert!(cache.fresh().await.is_none());
    }

    #[tokio::test]
    async fn entry_expires_after_ttl() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = RepositoryCache::new(std::time::Duration::from_secs(300), clock.clone());
        cache.store(records(5)).await;

        clock.advance(Duration::minutes(4));
        assert_eq!(cache.fresh().await.map(|r| r.len()), Some(5));

        clock.advance(Duration::minutes(2));
        assert!(cache.fresh().await.is_none());
    }

    #[test]
    fn freshness_boundary_is_inclusive() {
        let fetched_at = Utc::now();
        let entry = CacheEntry {
            records: Vec::new(),
            fetched_at,
        };
        let ttl = Duration::minutes(5);
        assert!(entry.is_fresh(fetched_at + ttl, ttl));
        assert!(!entry.is_fresh(fetched_at + ttl + Duration::seconds(1), ttl));
    }
}
