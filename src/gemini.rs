//! Gemini API client
//!
//! Schema-constrained JSON generation for the narrative summarizer.
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::error::MonitorError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: &str) -> crate::Result<Self> {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, model: &str, base_url: &str) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!(
                "{}/{}:generateContent",
                base_url.trim_end_matches('/'),
                model
            ),
        })
    }

    /// Generate a JSON document constrained by `response_schema`
    pub async fn generate_json(
        &self,
        system_prompt: &str,
        prompt: &str,
        response_schema: serde_json::Value,
    ) -> crate::Result<serde_json::Value> {

        if self.api_key.is_empty() {
            return Err(MonitorError::Llm("GEMINI_API_KEY not configured".to_string()));
        }

        let url = format!("{}?key={}", self.endpoint, self.api_key);
        let request = build_request(system_prompt, prompt, response_schema);

        info!("Calling Gemini API");

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                MonitorError::Llm(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Gemini API error response: {}", error_text);
            return Err(MonitorError::Llm(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            MonitorError::Llm(format!("Gemini parse error: {}", e))
        })?;

        let text = first_text(&gemini_response)?;
        let value = serde_json::from_str(strip_code_fence(text)).map_err(|e| {
            error!("Gemini returned non-JSON content: {}", e);
            MonitorError::Llm(format!("Gemini returned invalid JSON: {}", e))
        })?;

        info!("Gemini response received");

        Ok(value)
    }
}

fn build_request(
    system_prompt: &str,
    prompt: &str,
    response_schema: serde_json::Value,
) -> GeminiRequest {
    GeminiRequest {
        contents: vec![Content {
            parts: vec![Part {
                text: prompt.to_string(),
            }],
        }],
        generation_config: GenerationConfig {
            temperature: 0.3,
            top_p: 0.9,
            top_k: 40,
            max_output_tokens: 1024,
            response_mime_type: "application/json".to_string(),
            response_schema,
        },
        system_instruction: SystemInstruction {
            parts: vec![Part {
                text: system_prompt.to_string(),
            }],
        },
    }
}

fn first_text(response: &GeminiResponse) -> crate::Result<&str> {
    let candidate = response
        .candidates
        .first()
        .ok_or_else(|| MonitorError::Llm("No response from Gemini API".to_string()))?;

    candidate
        .content
        .parts
        .first()
        .map(|p| p.text.as_str())
        .ok_or_else(|| MonitorError::Llm("Empty response from Gemini".to_string()))
}

/// Models occasionally wrap JSON in a ```json fence despite the mime type
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    system_instruction: SystemInstruction,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}
