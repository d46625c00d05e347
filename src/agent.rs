//! Summarization dispatcher.
//!
//! Sends the text to exactly one provider. The free-tier provider walks its
//! candidate models until one produces a summary.

use crate::config::ProviderEndpoints;
use crate::provider::{Provider, ProviderParseError, UpstreamErrorBody};
use crate::summary::{SummaryRequest, SummaryResult};
use crate::transport::{ChatResponse, ChatTransport};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const MISSING_FIELDS: &str = "Missing required fields: text and credential are required";

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    UnsupportedProvider(#[from] ProviderParseError),
    #[error("{} API error ({model}): {message}", .provider.display_name())]
    Upstream {
        provider: Provider,
        model: &'static str,
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("{} request failed ({model}): {message}", .provider.display_name())]
    Transport {
        provider: Provider,
        model: &'static str,
        message: String,
    },
    #[error("{} returned an empty summary ({model})", .provider.display_name())]
    EmptySummary {
        provider: Provider,
        model: &'static str,
    },
    #[error("All {} models failed. Please check your API key.", .provider.display_name())]
    Exhausted { provider: Provider },
}

impl AgentError {
    /// Caller mistakes that never reach a provider
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::UnsupportedProvider(_))
    }

    /// Whether the next candidate model might succeed where this one failed.
    ///
    /// Upstream errors are classified by their structured `code` when the provider
    /// sends one, and by the message text otherwise. Credential problems are never
    /// retryable since every model would reject the same key.
    pub fn is_retryable_with_next_model(&self) -> bool {
        match self {
            Self::Upstream { code, message, .. } => match code {
                Some(code) => code.to_lowercase().contains("model"),
                None => message.to_lowercase().contains("model"),
            },
            Self::Transport { .. } | Self::EmptySummary { .. } => true,
            _ => false,
        }
    }
}

pub struct Summarizer {
    transport: Arc<dyn ChatTransport>,
    endpoints: ProviderEndpoints,
}

impl Summarizer {
    pub fn new(transport: Arc<dyn ChatTransport>, endpoints: ProviderEndpoints) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    /// Summarize `request.text` with the requested provider.
    ///
    /// Validation happens before any network call. The credential is only placed
    /// in the outbound request headers.
    pub async fn summarize(&self, request: &SummaryRequest) -> Result<SummaryResult, AgentError> {
        if !request.has_required_fields() {
            return Err(AgentError::Validation(MISSING_FIELDS.to_string()));
        }

        let provider = request.provider;
        let mut last_error = None;

        for &model in provider.models() {
            match self.call_model(provider, model, request).await {
                Ok(result) => {
                    info!("Summary generated by {} ({})", provider, model);
                    return Ok(result);
                }
                Err(e) if provider.falls_back_across_models() && e.is_retryable_with_next_model() => {
                    warn!("{} model {} failed, trying next: {}", provider, model, e);
                    // An empty reply is not a diagnosable failure; keep the last real one
                    if !matches!(e, AgentError::EmptySummary { .. }) {
                        last_error = Some(e);
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(AgentError::Exhausted { provider }))
    }

    async fn call_model(
        &self,
        provider: Provider,
        model: &'static str,
        request: &SummaryRequest,
    ) -> Result<SummaryResult, AgentError> {
        let outbound =
            provider.build_request(&self.endpoints, model, &request.text, &request.credential);
        debug!("Calling {} with model {}", provider, model);

        let response = self
            .transport
            .post(outbound)
            .await
            .map_err(|e| AgentError::Transport {
                provider,
                model,
                message: e.to_string(),
            })?;

        if !response.is_success() {
            return Err(upstream_error(provider, model, &response));
        }

        let body: serde_json::Value =
            serde_json::from_str(&response.body).map_err(|e| AgentError::Upstream {
                provider,
                model,
                status: response.status,
                code: None,
                message: format!("malformed response: {e}"),
            })?;

        provider
            .extract_summary(&body)
            .and_then(SummaryResult::new)
            .ok_or(AgentError::EmptySummary { provider, model })
    }
}

fn upstream_error(provider: Provider, model: &'static str, response: &ChatResponse) -> AgentError {
    let parsed = UpstreamErrorBody::parse(&response.body);
    let message = parsed.message.unwrap_or_else(|| {
        let reason = reqwest::StatusCode::from_u16(response.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown error");
        format!("HTTP {}: {}", response.status, reason)
    });

    AgentError::Upstream {
        provider,
        model,
        status: response.status,
        code: parsed.code,
        message,
    }
}
