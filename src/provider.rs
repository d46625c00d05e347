//! Text-generation providers.
//!
//! Each provider is a template over endpoint, auth headers, request body and the
//! path the summary is read back from.

use crate::config::ProviderEndpoints;
use crate::transport::ChatRequest;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Instruction sent as the system prompt (or folded into the user turn)
pub const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that summarizes text concisely in up to 3 sentences.";

/// Output cap for every provider
pub const MAX_TOKENS: u32 = 150;

const TEMPERATURE: f64 = 0.7;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Supported text-generation providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Provider {
    /// Free-tier provider with several candidate models
    Groq,
    #[default]
    OpenAI,
    Anthropic,
}

impl Provider {
    pub const ALL: &'static [Provider] = &[Provider::Groq, Provider::OpenAI, Provider::Anthropic];

    /// Provider name as used in requests and on the CLI
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
        }
    }

    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Groq => "Groq",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
        }
    }

    /// Candidate models in preference order; only Groq has more than one
    pub const fn models(&self) -> &'static [&'static str] {
        match self {
            Self::Groq => &[
                "llama-3.1-70b-versatile",
                "llama-3.1-8b-instant",
                "mixtral-8x7b-32768",
            ],
            Self::OpenAI => &["gpt-3.5-turbo"],
            Self::Anthropic => &["claude-3-haiku-20240307"],
        }
    }

    /// Environment variable the CLI reads the credential from
    pub const fn api_key_env(&self) -> &'static str {
        match self {
            Self::Groq => "GROQ_API_KEY",
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    /// Whether a failing model should fall through to the next candidate
    pub const fn falls_back_across_models(&self) -> bool {
        matches!(self, Self::Groq)
    }

    fn endpoint<'a>(&self, endpoints: &'a ProviderEndpoints) -> &'a str {
        match self {
            Self::Groq => &endpoints.groq,
            Self::OpenAI => &endpoints.openai,
            Self::Anthropic => &endpoints.anthropic,
        }
    }

    /// Build the upstream call for one model
    pub fn build_request(
        &self,
        endpoints: &ProviderEndpoints,
        model: &str,
        text: &str,
        credential: &str,
    ) -> ChatRequest {
        let user_prompt = format!("Please summarize the following text in up to 3 sentences:\n\n{text}");

        let (headers, body) = match self {
            Self::Groq | Self::OpenAI => (
                vec![("authorization", format!("Bearer {credential}"))],
                json!({
                    "model": model,
                    "messages": [
                        { "role": "system", "content": SYSTEM_PROMPT },
                        { "role": "user", "content": user_prompt },
                    ],
                    "max_tokens": MAX_TOKENS,
                    "temperature": TEMPERATURE,
                }),
            ),
            Self::Anthropic => (
                vec![
                    ("x-api-key", credential.to_string()),
                    ("anthropic-version", ANTHROPIC_VERSION.to_string()),
                ],
                json!({
                    "model": model,
                    "max_tokens": MAX_TOKENS,
                    "system": SYSTEM_PROMPT,
                    "messages": [
                        { "role": "user", "content": user_prompt },
                    ],
                }),
            ),
        };

        ChatRequest {
            url: self.endpoint(endpoints).to_string(),
            headers,
            body,
        }
    }

    /// Read the generated text out of a success body
    pub fn extract_summary(&self, body: &Value) -> Option<String> {
        let text = match self {
            Self::Groq | Self::OpenAI => body.pointer("/choices/0/message/content"),
            Self::Anthropic => body.pointer("/content/0/text"),
        };
        text.and_then(Value::as_str).map(|s| s.trim().to_string())
    }
}

impl FromStr for Provider {
    type Err = ProviderParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let normalized = if lower == "claude" { "anthropic" } else { &lower };

        Self::ALL
            .iter()
            .find(|p| p.name() == normalized)
            .copied()
            .ok_or_else(|| ProviderParseError(s.to_string()))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("Unsupported provider: {0}. Supported: groq, openai, anthropic")]
pub struct ProviderParseError(pub String);

/// Error fields reported by a provider on a non-success response
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpstreamErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl UpstreamErrorBody {
    /// Parse `{error: {message, code}}` or a top-level `{message}`
    pub fn parse(body: &str) -> Self {
        let Ok(value) = serde_json::from_str::<Value>(body) else {
            return Self::default();
        };

        let error = value.get("error");
        let message = error
            .and_then(|e| e.get("message"))
            .or_else(|| value.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let code = error
            .and_then(|e| e.get("code"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Self { code, message }
    }
}
