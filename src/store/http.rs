//! HTTP-backed entity store
//!
//! Talks to the hosted platform's REST surface, forwarding the caller's
//! bearer token on every request.

use crate::error::MonitorError;
use crate::models::Caller;
use crate::store::{EntityKind, EntityStore, IdentityResolver};
use crate::Result;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct HttpEntityStore {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl HttpEntityStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn entity_url(&self, kind: EntityKind) -> String {
        format!("{}/entities/{}", self.base_url, kind)
    }
}

/// Accept either a bare array or an `{ "items": [...] }` / `{ "data": [...] }` envelope
fn records_from_body(body: Value) -> Option<Vec<Value>> {
    match body {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => match map.remove("items").or_else(|| map.remove("data")) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

#[async_trait::async_trait]
impl EntityStore for HttpEntityStore {
    async fn list(&self, kind: EntityKind, caller: &Caller) -> Result<Vec<Value>> {
        let url = self.entity_url(kind);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&caller.access_token)
            .query(&[("created_by", caller.email.as_str())])
            .send()
            .await
            .map_err(|e| {
                MonitorError::Store(format!("Request for {} failed: {}", kind, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(MonitorError::Store(format!(
                "Entity store returned {} for {}: {}",
                status, kind, text
            )));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| MonitorError::Store(format!("Invalid JSON response for {}: {}", kind, e)))?;

        let records = records_from_body(body).ok_or_else(|| {
            MonitorError::Store(format!("Unexpected response shape for {}", kind))
        })?;

        debug!(entity = %kind, count = records.len(), "Fetched records");
        Ok(records)
    }
}

#[async_trait::async_trait]
impl IdentityResolver for HttpEntityStore {
    async fn resolve(&self, access_token: &str) -> Result<Option<Caller>> {
        let url = format!("{}/auth/me", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| MonitorError::Store(format!("Identity lookup failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(%status, "Access token rejected");
            return Ok(None);
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(MonitorError::Store(format!(
                "Identity lookup returned {}: {}",
                status, text
            )));
        }

        // A null body means no session
        let me: Option<MeResponse> = response.json().await.map_err(|e| {
            MonitorError::Store(format!("Invalid identity response: {}", e))
        })?;

        let Some(me) = me else {
            return Ok(None);
        };

        // Records are scoped by creator email; without one there is nothing to scope by
        let Some(email) = me.email.filter(|e| !e.trim().is_empty()) else {
            warn!(user_id = %me.id, "Identity has no email");
            return Ok(None);
        };

        Ok(Some(Caller {
            id: me.id,
            email,
            access_token: access_token.to_string(),
        }))
    }
}
