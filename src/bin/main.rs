use north_star_monitor::{
    config::Settings,
    derive_alerts,
    gemini::GeminiClient,
    models::Snapshot,
    monitor::FinancialHealthMonitor,
    store::InMemoryEntityStore,
    summarizer::GeminiSummarizer,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: north-star-monitor <snapshot.json> [--summarize]";

/// Evaluate a snapshot file offline and print the result
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let summarize = args.iter().any(|a| a == "--summarize");
    let Some(path) = args.iter().find(|a| !a.starts_with("--")) else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    let raw = std::fs::read_to_string(path)?;
    let snapshot: Snapshot = serde_json::from_str(&raw)?;

    info!(
        budgets = snapshot.budgets.len(),
        investments = snapshot.investments.len(),
        transactions = snapshot.transactions.len(),
        subscriptions = snapshot.subscriptions.len(),
        bills = snapshot.bills.len(),
        goals = snapshot.goals.len(),
        "Snapshot loaded"
    );

    if !summarize {
        let alerts = derive_alerts(&snapshot, Utc::now());
        println!("{}", serde_json::to_string_pretty(&alerts)?);
        return Ok(());
    }

    let settings = Settings::from_env()?;
    let gemini = GeminiClient::new(settings.gemini_api_key, &settings.gemini_model)?;
    let monitor = FinancialHealthMonitor::new(
        Arc::new(InMemoryEntityStore::new()),
        Arc::new(GeminiSummarizer::new(gemini)),
    );

    let report = monitor.evaluate(&snapshot, Utc::now()).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
