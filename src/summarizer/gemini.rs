//! Gemini-powered narrative summarizer
//!
//! Sends the alert digest to Gemini with a response schema and reads back
//! a `HealthSummary`.

use crate::gemini::GeminiClient;
use crate::models::{HealthSummary, SummaryRequest};
use crate::summarizer::NarrativeSummarizer;
use crate::Result;
use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

const SYSTEM_PROMPT: &str = r#"You are a friendly personal finance coach inside a family life-management app.

Guidelines:
- Base everything on the alerts provided; do not invent numbers
- Rank the alerts the user should act on first
- Keep the message to two or three encouraging sentences
- The key action must be one concrete step the user can take this week"#;

pub struct GeminiSummarizer {
    client: GeminiClient,
}

impl GeminiSummarizer {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    fn build_prompt(request: &SummaryRequest) -> String {
        let mut alert_lines = String::new();
        for alert in &request.alerts {
            alert_lines.push_str(&format!(
                "{}. [{}] {}: {}\n",
                alert.index, alert.severity, alert.title, alert.message
            ));
        }

        format!(
            r#"Analyze this user's financial health based on the alerts below.

ALERTS ({} total):
{}
CONTEXT:
- Budgets tracked: {}
- Investments: {}
- Subscriptions: {}
- Financial goals: {}

Provide:
1. health_score: overall financial health from 0 to 100
2. priority_alert_indices: indices of the most important alerts, most urgent first
3. health_message: a brief, encouraging summary
4. key_action: the single most important thing to do next"#,
            request.alerts.len(),
            alert_lines,
            request.budget_count,
            request.investment_count,
            request.subscription_count,
            request.goal_count,
        )
    }

    fn response_schema() -> serde_json::Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "health_score": { "type": "NUMBER" },
                "priority_alert_indices": {
                    "type": "ARRAY",
                    "items": { "type": "INTEGER" }
                },
                "health_message": { "type": "STRING" },
                "key_action": { "type": "STRING" }
            }
        })
    }
}

#[async_trait]
impl NarrativeSummarizer for GeminiSummarizer {
    async fn summarize(&self, request: &SummaryRequest) -> Result<HealthSummary> {
        let prompt = Self::build_prompt(request);

        info!(alert_count = request.alerts.len(), "Requesting narrative summary");

        let value = self
            .client
            .generate_json(SYSTEM_PROMPT, &prompt, Self::response_schema())
            .await?;

        let mut summary: HealthSummary = serde_json::from_value(value)?;

        // Drop indices that do not point into the alert list
        if let Some(indices) = summary.priority_alert_indices.as_mut() {
            let before = indices.len();
            let len = request.alerts.len();
            indices.retain(|i| usize::try_from(*i).is_ok_and(|i| i < len));
            if indices.len() != before {
                warn!(
                    dropped = before - indices.len(),
                    "Summarizer returned out-of-range alert indices"
                );
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::spawn_mock_server;
    use crate::error::MonitorError;
    use crate::models::{AlertDigest, Severity};
    use axum::http::{StatusCode, Uri};
    use axum::{Json, Router};

    const MODEL: &str = "gemini-test";

    /// Mock Gemini endpoint answering `generateContent` with `text` as the only part
    async fn summarizer_returning(status: StatusCode, text: &str) -> GeminiSummarizer {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] }, "finishReason": "STOP" }]
        });

        let router = Router::new().fallback(move |uri: Uri| {
            let body = body.clone();
            async move {
                if uri.path() != "/models/gemini-test:generateContent" {
                    return (StatusCode::NOT_FOUND, Json(json!({ "error": "unknown model" })));
                }
                (status, Json(body))
            }
        });

        let base_url = format!("{}/models", spawn_mock_server(router).await);
        let client = GeminiClient::with_base_url("test-key".to_string(), MODEL, &base_url).unwrap();
        GeminiSummarizer::new(client)
    }

    fn request() -> SummaryRequest {
        SummaryRequest {
            alerts: vec![AlertDigest {
                index: 0,
                severity: Severity::High,
                title: "1 overdue bill(s)".to_string(),
                message: "$50.00 is past due: Water.".to_string(),
            }],
            budget_count: 3,
            investment_count: 0,
            subscription_count: 2,
            goal_count: 1,
        }
    }

    #[test]
    fn test_prompt_lists_alerts_and_counts() {
        let prompt = GeminiSummarizer::build_prompt(&request());

        assert!(prompt.contains("ALERTS (1 total)"));
        assert!(prompt.contains("0. [high] 1 overdue bill(s): $50.00 is past due: Water."));
        assert!(prompt.contains("Budgets tracked: 3"));
        assert!(prompt.contains("Subscriptions: 2"));
    }

    #[test]
    fn test_schema_covers_summary_fields() {
        let schema = GeminiSummarizer::response_schema();
        let props = schema["properties"].as_object().unwrap();

        for field in ["health_score", "priority_alert_indices", "health_message", "key_action"] {
            assert!(props.contains_key(field), "missing {}", field);
        }
    }

    #[tokio::test]
    async fn test_summarize_parses_response_and_drops_bad_indices() {
        let text = json!({
            "health_score": 70,
            "priority_alert_indices": [0, -1, 5],
            "health_message": "One bill needs attention."
        })
        .to_string();
        let summarizer = summarizer_returning(StatusCode::OK, &text).await;

        let summary = summarizer.summarize(&request()).await.unwrap();

        assert_eq!(summary.health_score, Some(70.0));
        assert_eq!(summary.priority_alert_indices, Some(vec![0]));
        assert_eq!(summary.health_message.as_deref(), Some("One bill needs attention."));
        assert!(summary.key_action.is_none());
    }

    #[tokio::test]
    async fn test_summarize_accepts_fenced_json() {
        let summarizer =
            summarizer_returning(StatusCode::OK, "```json\n{\"key_action\": \"Pay Water\"}\n```").await;

        let summary = summarizer.summarize(&request()).await.unwrap();
        assert_eq!(summary.key_action.as_deref(), Some("Pay Water"));
        assert!(summary.priority_alert_indices.is_none());
    }

    #[tokio::test]
    async fn test_summarize_rejects_non_json_text() {
        let summarizer = summarizer_returning(StatusCode::OK, "Looks fine to me!").await;

        assert!(matches!(
            summarizer.summarize(&request()).await,
            Err(MonitorError::Llm(_))
        ));
    }

    #[tokio::test]
    async fn test_summarize_surfaces_upstream_failure() {
        let summarizer = summarizer_returning(StatusCode::SERVICE_UNAVAILABLE, "{}").await;

        match summarizer.summarize(&request()).await {
            Err(MonitorError::Llm(message)) => assert!(message.contains("503")),
            other => panic!("expected LLM error, got {:?}", other),
        }
    }
}
