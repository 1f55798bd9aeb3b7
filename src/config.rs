//! Environment-driven settings
//!
//! Values come from the process environment, optionally seeded from `.env`.

use crate::error::MonitorError;
use crate::Result;
use std::time::Duration;

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Settings {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub entity_store_base_url: Option<String>,
    pub entity_store_timeout: Duration,
    pub api_port: u16,
}

impl Settings {
    /// Load `.env` (if present) and read settings from the environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_port = match non_empty("PORT").or_else(|| non_empty("API_PORT")) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| MonitorError::Config(format!("Invalid port: {}", raw)))?,
            None => DEFAULT_PORT,
        };

        let timeout_secs = match non_empty("ENTITY_STORE_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                MonitorError::Config(format!("Invalid ENTITY_STORE_TIMEOUT_SECS: {}", raw))
            })?,
            None => DEFAULT_STORE_TIMEOUT_SECS,
        };

        Ok(Self {
            gemini_api_key: lookup("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: non_empty("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            entity_store_base_url: non_empty("ENTITY_STORE_BASE_URL"),
            entity_store_timeout: Duration::from_secs(timeout_secs),
            api_port,
        })
    }

    pub fn require_entity_store_url(&self) -> Result<&str> {
        self.entity_store_base_url
            .as_deref()
            .ok_or_else(|| MonitorError::Config("ENTITY_STORE_BASE_URL not set".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[]).unwrap();

        assert_eq!(s.api_port, 8080);
        assert_eq!(s.gemini_model, "gemini-2.0-flash");
        assert!(s.gemini_api_key.is_empty());
        assert_eq!(s.entity_store_timeout, Duration::from_secs(30));
        assert!(s.require_entity_store_url().is_err());
    }

    #[test]
    fn test_port_precedence() {
        let s = settings(&[("PORT", "9000"), ("API_PORT", "9100")]).unwrap();
        assert_eq!(s.api_port, 9000);

        let s = settings(&[("API_PORT", "9100")]).unwrap();
        assert_eq!(s.api_port, 9100);
    }

    #[test]
    fn test_invalid_numbers_are_config_errors() {
        assert!(matches!(settings(&[("PORT", "eighty")]), Err(MonitorError::Config(_))));
        assert!(matches!(
            settings(&[("ENTITY_STORE_TIMEOUT_SECS", "-1")]),
            Err(MonitorError::Config(_))
        ));
    }

    #[test]
    fn test_store_url() {
        let s = settings(&[("ENTITY_STORE_BASE_URL", "https://store.example.com")]).unwrap();
        assert_eq!(s.require_entity_store_url().unwrap(), "https://store.example.com");
    }
}
