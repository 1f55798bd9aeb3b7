//! Financial health monitor
//!
//! FETCH (fan-out) → DERIVE → SUMMARIZE? → REPORT
//!
//! All I/O lives here; the rule engine stays pure.

use crate::error::MonitorError;
use crate::models::{Caller, MonitorReport, Severity, Snapshot, SummaryRequest};
use crate::rules::derive_alerts;
use crate::store::{EntityKind, EntityStore};
use crate::summarizer::{all_clear_summary, NarrativeSummarizer};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

pub struct FinancialHealthMonitor {
    store: Arc<dyn EntityStore>,
    summarizer: Arc<dyn NarrativeSummarizer>,
}

impl FinancialHealthMonitor {
    pub fn new(store: Arc<dyn EntityStore>, summarizer: Arc<dyn NarrativeSummarizer>) -> Self {
        Self { store, summarizer }
    }

    /// Run one invocation for an authenticated caller
    pub async fn run(&self, caller: &Caller) -> Result<MonitorReport> {
        let invocation_id = Uuid::new_v4();
        let span = tracing::info_span!("monitor", %invocation_id, user_id = %caller.id);

        async {
            let start = Instant::now();
            let snapshot = self.load_snapshot(caller).await?;
            let report = self.evaluate(&snapshot, Utc::now()).await?;

            info!(
                total_alerts = report.total_alerts,
                high = report.high_severity,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Financial health check completed"
            );

            Ok::<_, MonitorError>(report)
        }
        .instrument(span)
        .await
    }

    /// Fetch all six collections concurrently
    pub async fn load_snapshot(&self, caller: &Caller) -> Result<Snapshot> {
        let (budgets, investments, transactions, subscriptions, bills, goals) = tokio::try_join!(
            self.fetch(EntityKind::Budget, caller),
            self.fetch(EntityKind::Investment, caller),
            self.fetch(EntityKind::BudgetTransaction, caller),
            self.fetch(EntityKind::Subscription, caller),
            self.fetch(EntityKind::BillPayment, caller),
            self.fetch(EntityKind::FinancialGoal, caller),
        )?;

        Ok(Snapshot {
            budgets,
            investments,
            transactions,
            subscriptions,
            bills,
            goals,
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, kind: EntityKind, caller: &Caller) -> Result<Vec<T>> {
        let raw = self.store.list(kind, caller).await?;
        let mut records = Vec::with_capacity(raw.len());

        for record in raw {
            match serde_json::from_value::<T>(record) {
                Ok(parsed) => records.push(parsed),
                Err(e) => warn!(entity = %kind, "Skipping malformed record: {}", e),
            }
        }

        Ok(records)
    }

    /// Derive alerts for a fetched snapshot and narrate them if any fired
    pub async fn evaluate(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> Result<MonitorReport> {
        let alerts = derive_alerts(snapshot, now);

        let high_severity = alerts.iter().filter(|a| a.severity == Severity::High).count();
        let medium_severity = alerts.iter().filter(|a| a.severity == Severity::Medium).count();

        let ai_summary = if alerts.is_empty() {
            info!("No alerts, returning all-clear");
            all_clear_summary()
        } else {
            let request = SummaryRequest::new(&alerts, snapshot);
            self.summarizer.summarize(&request).await?
        };

        Ok(MonitorReport {
            success: true,
            total_alerts: alerts.len(),
            alerts,
            ai_summary,
            high_severity,
            medium_severity,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{AlertKind, HealthSummary};
    use crate::store::InMemoryEntityStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every request; fails when `fail` is set
    #[derive(Default)]
    pub(crate) struct RecordingSummarizer {
        pub requests: Mutex<Vec<SummaryRequest>>,
        pub fail: bool,
    }

    #[async_trait]
    impl NarrativeSummarizer for RecordingSummarizer {
        async fn summarize(&self, request: &SummaryRequest) -> Result<HealthSummary> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(MonitorError::Llm("summarizer unavailable".to_string()));
            }
            Ok(HealthSummary {
                health_score: Some(60.0),
                priority_alert_indices: Some(vec![0]),
                health_message: None,
                key_action: None,
            })
        }
    }

    struct FailingStore;

    #[async_trait]
    impl EntityStore for FailingStore {
        async fn list(&self, kind: EntityKind, _caller: &Caller) -> Result<Vec<serde_json::Value>> {
            if kind == EntityKind::BillPayment {
                return Err(MonitorError::Store("BillPayment unavailable".to_string()));
            }
            Ok(Vec::new())
        }
    }

    async fn setup() -> (Arc<InMemoryEntityStore>, Caller) {
        let store = Arc::new(InMemoryEntityStore::new());
        let caller = store.register_caller("token", "user-1", "user@example.com").await;
        (store, caller)
    }

    #[tokio::test]
    async fn test_empty_snapshot_returns_all_clear() {
        let (store, caller) = setup().await;
        let summarizer = Arc::new(RecordingSummarizer::default());
        let monitor = FinancialHealthMonitor::new(store, summarizer.clone());

        let report = monitor.run(&caller).await.unwrap();

        assert!(report.success);
        assert_eq!(report.total_alerts, 0);
        assert_eq!(report.ai_summary.health_score, Some(95.0));
        assert_eq!(report.ai_summary, all_clear_summary());
        assert!(summarizer.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_overdue_bill_invokes_summarizer_once() {
        let (store, caller) = setup().await;
        store
            .insert(
                "user-1",
                EntityKind::BillPayment,
                serde_json::json!({
                    "bill_name": "Water",
                    "amount": 50,
                    "due_date": "2020-01-01",
                    "status": "pending"
                }),
            )
            .await;

        let summarizer = Arc::new(RecordingSummarizer::default());
        let monitor = FinancialHealthMonitor::new(store, summarizer.clone());

        let report = monitor.run(&caller).await.unwrap();

        assert_eq!(report.total_alerts, 1);
        assert_eq!(report.high_severity, 1);
        assert_eq!(report.medium_severity, 0);
        assert_eq!(report.alerts[0].kind, AlertKind::OverdueBills);
        assert_eq!(report.alerts[0].data["total_amount"], 50.0);
        assert_eq!(report.ai_summary.health_score, Some(60.0));

        let requests = summarizer.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].alerts.len(), 1);
        assert_eq!(requests[0].alerts[0].index, 0);
        assert_eq!(requests[0].alerts[0].severity, Severity::High);
    }

    #[tokio::test]
    async fn test_summary_request_carries_counts() {
        let (store, caller) = setup().await;
        store
            .insert("user-1", EntityKind::Budget, serde_json::json!({"category": "Food", "current_spending": 95, "monthly_limit": 100}))
            .await;
        store
            .insert("user-1", EntityKind::Budget, serde_json::json!({"category": "Fun", "current_spending": 1, "monthly_limit": 100}))
            .await;
        store
            .insert("user-1", EntityKind::FinancialGoal, serde_json::json!({"title": "Car"}))
            .await;

        let summarizer = Arc::new(RecordingSummarizer::default());
        let monitor = FinancialHealthMonitor::new(store, summarizer.clone());
        let report = monitor.run(&caller).await.unwrap();

        assert_eq!(report.medium_severity, 1);

        let requests = summarizer.requests.lock().unwrap();
        assert_eq!(requests[0].budget_count, 2);
        assert_eq!(requests[0].goal_count, 1);
        assert_eq!(requests[0].investment_count, 0);
    }

    #[tokio::test]
    async fn test_malformed_records_do_not_hide_other_alerts() {
        let (store, caller) = setup().await;
        store
            .insert(
                "user-1",
                EntityKind::Subscription,
                serde_json::json!({"id": 42, "name": "Streaming", "monthly_cost": 12, "status": "active"}),
            )
            .await;
        store
            .insert("user-1", EntityKind::Subscription, serde_json::json!("not a record"))
            .await;
        store
            .insert(
                "user-1",
                EntityKind::BillPayment,
                serde_json::json!({"bill_name": "Water", "amount": 50, "due_date": "2020-01-01"}),
            )
            .await;

        let summarizer = Arc::new(RecordingSummarizer::default());
        let monitor = FinancialHealthMonitor::new(store.clone(), summarizer);

        let snapshot = monitor.load_snapshot(&caller).await.unwrap();
        assert_eq!(snapshot.subscriptions.len(), 1);
        assert_eq!(snapshot.subscriptions[0].id.as_deref(), Some("42"));

        let report = monitor.run(&caller).await.unwrap();
        assert_eq!(report.total_alerts, 1);
        assert_eq!(report.alerts[0].kind, AlertKind::OverdueBills);
        assert_eq!(report.alerts[0].data["total_amount"], 50.0);
    }

    #[tokio::test]
    async fn test_summarizer_failure_fails_invocation() {
        let (store, caller) = setup().await;
        store
            .insert("user-1", EntityKind::Investment, serde_json::json!({"account_name": "X", "unrealized_gain_loss_percent": -40}))
            .await;

        let summarizer = Arc::new(RecordingSummarizer {
            fail: true,
            ..Default::default()
        });
        let monitor = FinancialHealthMonitor::new(store, summarizer);

        assert!(matches!(monitor.run(&caller).await, Err(MonitorError::Llm(_))));
    }

    #[tokio::test]
    async fn test_store_failure_fails_invocation() {
        let (_, caller) = setup().await;
        let monitor = FinancialHealthMonitor::new(
            Arc::new(FailingStore),
            Arc::new(RecordingSummarizer::default()),
        );

        assert!(matches!(monitor.run(&caller).await, Err(MonitorError::Store(_))));
    }
}
