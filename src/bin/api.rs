use north_star_monitor::{
    api::{start_server, ApiState},
    config::Settings,
    gemini::GeminiClient,
    monitor::FinancialHealthMonitor,
    store::HttpEntityStore,
    summarizer::GeminiSummarizer,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env()?;

    if settings.gemini_api_key.is_empty() {
        warn!("GEMINI_API_KEY not set; requests that produce alerts will fail");
    }

    info!("North Star Financial Health Monitor - API Server");
    info!("Port: {}", settings.api_port);

    // Create components
    let store = Arc::new(HttpEntityStore::new(
        settings.require_entity_store_url()?,
        settings.entity_store_timeout,
    )?);
    let gemini = GeminiClient::new(settings.gemini_api_key.clone(), &settings.gemini_model)?;
    let summarizer = Arc::new(GeminiSummarizer::new(gemini));

    let monitor = Arc::new(FinancialHealthMonitor::new(store.clone(), summarizer));
    let state = ApiState {
        monitor,
        identity: store,
    };

    info!("Monitor initialized");

    start_server(state, settings.api_port).await?;

    Ok(())
}
