//! HTTP surface: trending list, summaries and health.

use crate::agent::{AgentError, Summarizer, MISSING_FIELDS};
use crate::cache::{RepositoryCache, SystemClock};
use crate::config::Config;
use crate::provider::Provider;
use crate::repository::RepositoryRecord;
use crate::search::GitHubSearch;
use crate::summary::{SummaryRequest, SummaryResult};
use crate::transport::HttpTransport;
use crate::trending::{TrendingError, TrendingService};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, MethodRouter};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// User-Agent sent on every upstream call
const USER_AGENT: &str = concat!("trendwire/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Services shared by every handler
pub struct AppState {
    pub trending: TrendingService,
    pub summarizer: Summarizer,
}

impl AppState {
    pub fn new(trending: TrendingService, summarizer: Summarizer) -> Self {
        Self {
            trending,
            summarizer,
        }
    }

    /// Wire up the real upstream clients from configuration
    pub fn from_config(config: &Config) -> Result<Self, ServerError> {
        let client = create_client(config)?;

        let search = GitHubSearch::new(client.clone(), &config.github);
        let cache = RepositoryCache::new(config.cache_ttl(), Arc::new(SystemClock));
        let trending = TrendingService::new(Arc::new(search), cache, config.github.recency_days);

        let summarizer = Summarizer::new(
            Arc::new(HttpTransport::new(client)),
            config.providers.clone(),
        );

        Ok(Self::new(trending, summarizer))
    }
}

/// Create the HTTP client used for all upstream calls
fn create_client(config: &Config) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(config.request_timeout())
        .build()
}

/// Error body returned to callers
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Handler-level failure mapped to a status and JSON body
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    MethodNotAllowed,
    Upstream { error: &'static str, message: String },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(error) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error,
                    message: None,
                },
            ),
            Self::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                ErrorResponse {
                    error: "Method not allowed".to_string(),
                    message: None,
                },
            ),
            Self::Upstream { error, message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: error.to_string(),
                    message: Some(message),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

impl From<TrendingError> for ApiError {
    fn from(e: TrendingError) -> Self {
        Self::Upstream {
            error: "Failed to fetch repositories",
            message: e.to_string(),
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(e: AgentError) -> Self {
        if e.is_client_error() {
            Self::BadRequest(e.to_string())
        } else {
            Self::Upstream {
                error: "Failed to generate summary",
                message: e.to_string(),
            }
        }
    }
}

/// Body of `POST /summaries`. Everything is optional so missing fields reach validation.
#[derive(Debug, Default, Deserialize)]
pub struct SummaryBody {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, alias = "apiKey")]
    pub credential: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

impl SummaryBody {
    /// Validate and convert into a dispatch request.
    ///
    /// Missing fields are reported before an unrecognised provider.
    pub fn into_request(self) -> Result<SummaryRequest, AgentError> {
        let text = self.text.unwrap_or_default();
        let credential = self.credential.unwrap_or_default();
        if text.trim().is_empty() || credential.trim().is_empty() {
            return Err(AgentError::Validation(MISSING_FIELDS.to_string()));
        }

        let provider = match self.provider.as_deref() {
            Some(name) => name.parse::<Provider>()?,
            None => Provider::default(),
        };
        Ok(SummaryRequest::new(text, credential, provider))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn list_repositories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RepositoryRecord>>, ApiError> {
    let records = state.trending.fetch_trending().await.map_err(|e| {
        error!("Error fetching repositories: {}", e);
        ApiError::from(e)
    })?;
    Ok(Json(records))
}

pub async fn create_summary(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SummaryBody>, JsonRejection>,
) -> Result<Json<SummaryResult>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request = body.into_request()?;

    let result = state.summarizer.summarize(&request).await.map_err(|e| {
        if !e.is_client_error() {
            error!("Error generating summary: {}", e);
        }
        ApiError::from(e)
    })?;
    Ok(Json(result))
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

fn repositories_route() -> MethodRouter<Arc<AppState>> {
    get(list_repositories).fallback(method_not_allowed)
}

fn summaries_route() -> MethodRouter<Arc<AppState>> {
    post(create_summary).fallback(method_not_allowed)
}

/// Create the HTTP router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/repositories", repositories_route())
        .route("/summaries", summaries_route())
        .route("/api/github", repositories_route())
        .route("/api/summarize", summaries_route())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn run(config: &Config) -> Result<(), ServerError> {
    let state = Arc::new(AppState::from_config(config)?);
    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    info!("trendwire listening on {}", addr);
    axum::serve(listener, create_router(state))
        .await
        .map_err(ServerError::Serve)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(text: Option<&str>, credential: Option<&str>, provider: Option<&str>) -> SummaryBody {
        SummaryBody {
            text: text.map(str::to_string),
            credential: credential.map(str::to_string),
            provider: provider.map(str::to_string),
        }
    }

    #[test]
    fn provider_defaults_to_general_purpose() {
        let request = body(Some("t"), Some("k"), None).into_request().unwrap();
        assert_eq!(request.provider, Provider::OpenAI);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = body(Some("t"), Some("k"), Some("foo"))
            .into_request()
            .unwrap_err();
        assert!(matches!(err, AgentError::UnsupportedProvider(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn missing_fields_take_precedence_over_bad_provider() {
        let err = body(Some(""), Some("k"), Some("foo"))
            .into_request()
            .unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
    }

    #[test]
    fn api_key_alias_is_accepted() {
        let parsed: SummaryBody =
            serde_json::from_str(r#"{"text":"t","apiKey":"k","provider":"groq"}"#).unwrap();
        let request = parsed.into_request().unwrap();
        assert_eq!(request.credential, "k");
        assert_eq!(request.provider, Provider::Groq);
    }

    #[test]
    fn client_errors_map_to_bad_request() {
        let response = ApiError::from(AgentError::Validation("missing".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::from(TrendingError::NoResults).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
