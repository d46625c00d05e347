//! Repository records - the output of the trending fetch.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

/// Placeholder used when an upstream repository has no description
pub const DEFAULT_DESCRIPTION: &str = "No description available";

/// A repository as served to clients.
///
/// Created fresh from each successful upstream fetch and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRecord {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: String,
    pub url: String,
    pub stars: u64,
    pub language: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A repository object as returned by the code-search API.
///
/// Everything except `id` is optional, and a field with an unreadable value reads as
/// absent, so one bad item only loses its own fields.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamRepository {
    pub id: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub html_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub stargazers_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Read a field as `Some` only when it has the expected shape
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

impl From<UpstreamRepository> for RepositoryRecord {
    fn from(repo: UpstreamRepository) -> Self {
        let description = repo
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

        Self {
            id: repo.id,
            name: repo.name.unwrap_or_default(),
            full_name: repo.full_name.unwrap_or_default(),
            description,
            url: repo.html_url.unwrap_or_default(),
            stars: repo.stargazers_count.unwrap_or(0),
            language: repo.language,
            created_at: repo.created_at,
            updated_at: repo.updated_at,
        }
    }
}

/// Drop records whose id was already seen, keeping the first occurrence in order
pub fn dedup_by_id(records: Vec<RepositoryRecord>) -> Vec<RepositoryRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(record.id))
        .collect()
}
