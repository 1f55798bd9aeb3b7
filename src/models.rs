//! Core data models for the financial health monitor

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    BudgetWarning,
    BudgetExceeded,
    InvestmentDecline,
    ConcentrationRisk,
    SubscriptionChange,
    HighSubscriptionCost,
    GoalBehindSchedule,
    OverdueBills,
}

//
// ================= Entities =================
//
// Snapshots of records owned by the hosted entity store. Numbers that are
// missing (or null) read as 0; dates that are missing or unparseable read
// as None; numeric ids and labels read as their decimal text.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Budget {
    #[serde(default, deserialize_with = "lenient_text")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub current_spending: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub monthly_limit: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Investment {
    #[serde(default, deserialize_with = "lenient_text")]
    pub account_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub unrealized_gain_loss_percent: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub current_value: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BudgetTransaction {
    #[serde(default, deserialize_with = "lenient_text")]
    pub source_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub source_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub amount: f64,
    #[serde(default, with = "flexible_date")]
    pub transaction_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub monthly_cost: f64,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.status.as_deref() == Some("active")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillPayment {
    #[serde(default, deserialize_with = "lenient_text")]
    pub bill_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub amount: f64,
    #[serde(default, with = "flexible_date")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
}

impl BillPayment {
    pub fn is_paid(&self) -> bool {
        self.status.as_deref() == Some("paid")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialGoal {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub target_amount: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub current_amount: f64,
    #[serde(default, with = "flexible_date")]
    pub target_date: Option<DateTime<Utc>>,
}

//
// ================= Snapshot =================
//

/// Per-user records fetched once per invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub budgets: Vec<Budget>,
    #[serde(default)]
    pub investments: Vec<Investment>,
    #[serde(default)]
    pub transactions: Vec<BudgetTransaction>,
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
    #[serde(default)]
    pub bills: Vec<BillPayment>,
    #[serde(default)]
    pub goals: Vec<FinancialGoal>,
}

//
// ================= Alerts =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub actionable_advice: String,
    pub data: serde_json::Value,
}

//
// ================= Summarizer I/O =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertDigest {
    pub index: usize,
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub alerts: Vec<AlertDigest>,
    pub budget_count: usize,
    pub investment_count: usize,
    pub subscription_count: usize,
    pub goal_count: usize,
}

impl SummaryRequest {
    pub fn new(alerts: &[Alert], snapshot: &Snapshot) -> Self {
        Self {
            alerts: alerts
                .iter()
                .enumerate()
                .map(|(index, alert)| AlertDigest {
                    index,
                    severity: alert.severity,
                    title: alert.title.clone(),
                    message: alert.message.clone(),
                })
                .collect(),
            budget_count: snapshot.budgets.len(),
            investment_count: snapshot.investments.len(),
            subscription_count: snapshot.subscriptions.len(),
            goal_count: snapshot.goals.len(),
        }
    }
}

/// Narrative summary returned by the LLM. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_score: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_indices",
        skip_serializing_if = "Option::is_none"
    )]
    pub priority_alert_indices: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_action: Option<String>,
}

//
// ================= Final Result =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorReport {
    pub success: bool,
    pub alerts: Vec<Alert>,
    pub ai_summary: HealthSummary,
    pub total_alerts: usize,
    pub high_severity: usize,
    pub medium_severity: usize,
}

/// Resolved identity of the authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub id: String,
    pub email: String,
    #[serde(skip)]
    pub access_token: String,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        write!(f, "{}", s)
    }
}

//
// ================= Lenient field parsing =================
//

/// Accept RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS` (read as UTC)
/// and plain `YYYY-MM-DD` dates (UTC midnight).
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;

    Ok(match raw {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;

    Ok(match raw {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Keep integral entries only; range checks happen against the alert list
fn lenient_indices<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;

    Ok(match raw {
        Some(serde_json::Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(|item| {
                    item.as_i64().or_else(|| {
                        item.as_f64()
                            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                            .map(|f| f as i64)
                    })
                })
                .collect(),
        ),
        _ => None,
    })
}

mod flexible_date {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(raw
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .and_then(super::parse_date))
    }
}
