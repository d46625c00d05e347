//! Summary request and result types.

use crate::provider::Provider;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One summarization call's inputs. Lives only for the duration of a dispatch.
#[derive(Clone)]
pub struct SummaryRequest {
    pub text: String,
    pub credential: String,
    pub provider: Provider,
}

impl SummaryRequest {
    pub fn new(text: impl Into<String>, credential: impl Into<String>, provider: Provider) -> Self {
        Self {
            text: text.into(),
            credential: credential.into(),
            provider,
        }
    }

    /// Both text and credential must carry something other than whitespace
    pub fn has_required_fields(&self) -> bool {
        !self.text.trim().is_empty() && !self.credential.trim().is_empty()
    }
}

impl fmt::Debug for SummaryRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummaryRequest")
            .field("text_len", &self.text.len())
            .field("credential", &"<redacted>")
            .field("provider", &self.provider)
            .finish()
    }
}

/// A generated summary. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub summary: String,
}

impl SummaryResult {
    /// Wrap a trimmed summary, rejecting blank output
    pub fn new(summary: impl Into<String>) -> Option<Self> {
        let summary = summary.into().trim().to_string();
        (!summary.is_empty()).then_some(Self { summary })
    }
}
