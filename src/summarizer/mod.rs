//! Narrative summarizer trait and implementations
//!
//! The summarizer turns the derived alert list into a health score,
//! a priority ranking and a short message. It never sees raw records.

use crate::models::{HealthSummary, SummaryRequest};
use crate::Result;
use async_trait::async_trait;

pub mod gemini;
pub use gemini::GeminiSummarizer;

/// Trait for alert narration (LLM controlled)
#[async_trait]
pub trait NarrativeSummarizer: Send + Sync {
    /// Summarize a non-empty alert list. Called at most once per invocation.
    async fn summarize(&self, request: &SummaryRequest) -> Result<HealthSummary>;
}

/// Canned summary returned when no rule fired
pub fn all_clear_summary() -> HealthSummary {
    HealthSummary {
        health_score: Some(95.0),
        priority_alert_indices: Some(Vec::new()),
        health_message: Some(
            "Your finances look healthy! No alerts at this time.".to_string(),
        ),
        key_action: Some(
            "Keep tracking your spending and contributing to your goals.".to_string(),
        ),
    }
}
