//! # Trendwire
//!
//! A small web service listing trending AI/ML repositories and summarizing their
//! descriptions with the caller's own LLM key.
//!
//! ## Features
//!
//! - **Fetch cascade**: tries narrow search queries first and broadens until one matches
//! - **Time-boxed cache**: one process-wide list reused for five minutes
//! - **Provider dispatch**: Groq (with model fallback), OpenAI and Anthropic

pub mod agent;
pub mod cache;
pub mod config;
pub mod logging;
pub mod provider;
pub mod repository;
pub mod search;
pub mod server;
pub mod summary;
pub mod transport;
pub mod trending;

pub use agent::{AgentError, Summarizer};
pub use config::Config;
pub use provider::Provider;
pub use repository::RepositoryRecord;
pub use server::{create_router, AppState};
pub use summary::{SummaryRequest, SummaryResult};
pub use trending::{TrendingError, TrendingService};
