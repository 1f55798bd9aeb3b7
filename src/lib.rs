//! North Star Financial Health Monitor
//!
//! Reads a user's budgets, investments, transactions, subscriptions, bills
//! and goals from the hosted entity store and:
//! - Derives threshold-based alerts with deterministic rules
//! - Narrates and ranks them with an LLM when any fired
//! - Returns a canned all-clear otherwise
//!
//! FLOW:
//! AUTH → FETCH (fan-out) → DERIVE → SUMMARIZE? → REPORT

pub mod api;
pub mod config;
pub mod error;
pub mod gemini;
pub mod models;
pub mod monitor;
pub mod rules;
pub mod store;
pub mod summarizer;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use monitor::FinancialHealthMonitor;
pub use rules::derive_alerts;
