//! Alert derivation rules
//!
//! Pure, deterministic threshold checks over a per-user snapshot.
//! Each rule is evaluated once; results are concatenated in table order.

use crate::models::{Alert, AlertKind, BudgetTransaction, Severity, Snapshot};
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::debug;

const BUDGET_WARNING_PERCENT: f64 = 90.0;
const BUDGET_EXCEEDED_PERCENT: f64 = 100.0;
const INVESTMENT_DECLINE_PERCENT: f64 = -15.0;
const CONCENTRATION_PERCENT: f64 = 40.0;
const RECENT_SUBSCRIPTION_TRANSACTIONS: usize = 20;
const PRICE_HISTORY_DEPTH: usize = 3;
const PRICE_CHANGE_PERCENT: f64 = 20.0;
const SUBSCRIPTION_COST_LIMIT: f64 = 100.0;
const GOAL_WINDOW_DAYS: i64 = 90;
const GOAL_ON_TRACK_PERCENT: f64 = 80.0;
const MS_PER_DAY: f64 = 86_400_000.0;

type Rule = fn(&Snapshot, DateTime<Utc>) -> Vec<Alert>;

/// Rules in emission order
const RULES: [(&str, Rule); 7] = [
    ("budget_overspend", budget_overspend),
    ("investment_decline", investment_decline),
    ("concentration_risk", concentration_risk),
    ("subscription_price_change", subscription_price_change),
    ("high_subscription_cost", high_subscription_cost),
    ("goal_behind_schedule", goal_behind_schedule),
    ("overdue_bills", overdue_bills),
];

/// Derive every alert for a snapshot as of `now`
pub fn derive_alerts(snapshot: &Snapshot, now: DateTime<Utc>) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for (name, rule) in RULES {
        let fired = rule(snapshot, now);
        debug!(rule = name, fired = fired.len(), "Rule evaluated");
        alerts.extend(fired);
    }

    alerts
}

/// `numerator / denominator * 100`, or 0 when the denominator is not positive
fn percent_of(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator * 100.0
    } else {
        0.0
    }
}

fn label(value: &Option<String>, fallback: &str) -> String {
    value
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn alert(
    kind: AlertKind,
    severity: Severity,
    title: String,
    message: String,
    actionable_advice: String,
    data: serde_json::Value,
) -> Alert {
    Alert {
        kind,
        severity,
        title,
        message,
        actionable_advice,
        data,
    }
}

//
// ================= Rule 1: Budgets =================
//

fn budget_overspend(snapshot: &Snapshot, _now: DateTime<Utc>) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for budget in &snapshot.budgets {
        let category = label(&budget.category, "Uncategorized");
        let spending = budget.current_spending;
        let limit = budget.monthly_limit;
        let percentage = percent_of(spending, limit);

        if percentage > BUDGET_EXCEEDED_PERCENT {
            let overage = spending - limit;
            alerts.push(alert(
                AlertKind::BudgetExceeded,
                Severity::High,
                format!("{} budget exceeded", category),
                format!(
                    "You've spent ${:.2} of your ${:.2} {} budget, ${:.2} over the limit.",
                    spending, limit, category, overage
                ),
                format!(
                    "Pause non-essential {} purchases for the rest of the month and review recent transactions.",
                    category.to_lowercase()
                ),
                json!({
                    "category": category,
                    "percentage": percentage,
                    "spending": spending,
                    "limit": limit,
                    "overage": overage,
                }),
            ));
        } else if percentage > BUDGET_WARNING_PERCENT {
            alerts.push(alert(
                AlertKind::BudgetWarning,
                Severity::Medium,
                format!("{} budget almost used", category),
                format!(
                    "You've used {:.0}% of your {} budget (${:.2} of ${:.2}).",
                    percentage, category, spending, limit
                ),
                format!(
                    "Only ${:.2} left for {}. Hold off on optional spending until the next period.",
                    limit - spending,
                    category.to_lowercase()
                ),
                json!({
                    "category": category,
                    "percentage": percentage,
                    "spending": spending,
                    "limit": limit,
                }),
            ));
        }
    }

    alerts
}

//
// ================= Rules 2-3: Investments =================
//

fn investment_decline(snapshot: &Snapshot, _now: DateTime<Utc>) -> Vec<Alert> {
    snapshot
        .investments
        .iter()
        .filter(|inv| inv.unrealized_gain_loss_percent < INVESTMENT_DECLINE_PERCENT)
        .map(|inv| {
            let account = label(&inv.account_name, "Investment account");
            let change = inv.unrealized_gain_loss_percent;
            alert(
                AlertKind::InvestmentDecline,
                Severity::High,
                format!("{} down {:.1}%", account, change.abs()),
                format!(
                    "{} has an unrealized loss of {:.1}% (current value ${:.2}).",
                    account, change.abs(), inv.current_value
                ),
                "Review whether this holding still fits your plan before making changes. Avoid panic selling.".to_string(),
                json!({
                    "account_name": account,
                    "unrealized_gain_loss_percent": change,
                    "current_value": inv.current_value,
                }),
            )
        })
        .collect()
}

fn concentration_risk(snapshot: &Snapshot, _now: DateTime<Utc>) -> Vec<Alert> {
    let investments = &snapshot.investments;
    if investments.len() < 2 {
        return Vec::new();
    }

    let total: f64 = investments.iter().map(|inv| inv.current_value).sum();
    if total <= 0.0 {
        return Vec::new();
    }

    // First holding wins ties
    let Some(largest) = investments
        .iter()
        .reduce(|best, inv| if inv.current_value > best.current_value { inv } else { best })
    else {
        return Vec::new();
    };

    let concentration = largest.current_value / total * 100.0;
    if concentration <= CONCENTRATION_PERCENT {
        return Vec::new();
    }

    let account = label(&largest.account_name, "One account");
    vec![alert(
        AlertKind::ConcentrationRisk,
        Severity::Medium,
        "Portfolio concentration risk".to_string(),
        format!(
            "{} holds {:.0}% of your invested assets.",
            account, concentration
        ),
        "Consider spreading new contributions across other holdings to reduce single-account risk.".to_string(),
        json!({
            "account_name": account,
            "concentration": concentration,
            "largest_value": largest.current_value,
            "total_value": total,
        }),
    )]
}

//
// ================= Rules 4-5: Subscriptions =================
//

/// Most recent subscription-sourced transactions, newest first.
/// Undated records sort after every dated one.
fn recent_subscription_transactions(transactions: &[BudgetTransaction]) -> Vec<&BudgetTransaction> {
    let mut recent: Vec<&BudgetTransaction> = transactions
        .iter()
        .filter(|t| t.source_type.as_deref() == Some("subscription"))
        .collect();

    // Stable sort keeps input order among equal dates
    recent.sort_by(|a, b| b.transaction_date.cmp(&a.transaction_date));
    recent.truncate(RECENT_SUBSCRIPTION_TRANSACTIONS);
    recent
}

fn subscription_price_change(snapshot: &Snapshot, _now: DateTime<Utc>) -> Vec<Alert> {
    let recent = recent_subscription_transactions(&snapshot.transactions);
    let mut alerts = Vec::new();

    for sub in snapshot.subscriptions.iter().filter(|s| s.is_active()) {
        let Some(sub_id) = sub.id.as_deref() else {
            continue;
        };

        let amounts: Vec<f64> = recent
            .iter()
            .filter(|t| t.source_id.as_deref() == Some(sub_id))
            .take(PRICE_HISTORY_DEPTH)
            .map(|t| t.amount)
            .collect();

        if amounts.len() < 2 {
            continue;
        }

        let latest = amounts[0];
        let previous = &amounts[1..];
        let avg_previous = previous.iter().sum::<f64>() / previous.len() as f64;
        if avg_previous <= 0.0 {
            continue;
        }

        let change_percent = (latest - avg_previous) / avg_previous * 100.0;
        if change_percent.abs() <= PRICE_CHANGE_PERCENT {
            continue;
        }

        let name = label(&sub.name, "Subscription");
        let increased = change_percent > 0.0;
        let (severity, direction, advice) = if increased {
            (
                Severity::Medium,
                "increased",
                format!("Check whether {} changed plans or pricing, and cancel or downgrade if it's no longer worth it.", name),
            )
        } else {
            (
                Severity::Low,
                "decreased",
                format!("{} got cheaper. Confirm the plan still includes what you use.", name),
            )
        };

        alerts.push(alert(
            AlertKind::SubscriptionChange,
            severity,
            format!("{} price {}", name, direction),
            format!(
                "{} charged ${:.2}, {:.0}% {} than your recent average of ${:.2}.",
                name,
                latest,
                change_percent.abs(),
                if increased { "more" } else { "less" },
                avg_previous
            ),
            advice,
            json!({
                "subscription_id": sub_id,
                "subscription_name": name,
                "latest_amount": latest,
                "average_previous": avg_previous,
                "change_percent": change_percent,
            }),
        ));
    }

    alerts
}

fn high_subscription_cost(snapshot: &Snapshot, _now: DateTime<Utc>) -> Vec<Alert> {
    let active: Vec<_> = snapshot.subscriptions.iter().filter(|s| s.is_active()).collect();
    let total: f64 = active.iter().map(|s| s.monthly_cost).sum();

    if total <= SUBSCRIPTION_COST_LIMIT {
        return Vec::new();
    }

    vec![alert(
        AlertKind::HighSubscriptionCost,
        Severity::Low,
        "Subscriptions add up".to_string(),
        format!(
            "You're paying ${:.2}/month across {} active subscriptions (${:.2}/year).",
            total,
            active.len(),
            total * 12.0
        ),
        "Audit your subscriptions and cancel the ones you haven't used in the last month.".to_string(),
        json!({
            "total_monthly_cost": total,
            "annual_cost": total * 12.0,
            "active_count": active.len(),
        }),
    )]
}

//
// ================= Rule 6: Goals =================
//

fn goal_behind_schedule(snapshot: &Snapshot, now: DateTime<Utc>) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for goal in &snapshot.goals {
        let Some(target_date) = goal.target_date else {
            continue;
        };

        let millis = (target_date - now).num_milliseconds() as f64;
        let days_until_target = (millis / MS_PER_DAY).ceil() as i64;
        let progress = percent_of(goal.current_amount, goal.target_amount);

        if days_until_target <= 0
            || days_until_target >= GOAL_WINDOW_DAYS
            || progress >= GOAL_ON_TRACK_PERCENT
        {
            continue;
        }

        let remaining = goal.target_amount - goal.current_amount;
        let needed_monthly = remaining / (days_until_target as f64 / 30.0);
        let title = label(&goal.title, "Financial goal");

        alerts.push(alert(
            AlertKind::GoalBehindSchedule,
            Severity::Medium,
            format!("{} is behind schedule", title),
            format!(
                "{} is {:.0}% funded with {} days left.",
                title, progress, days_until_target
            ),
            format!(
                "Save about ${:.2}/month to reach it on time, or consider moving the target date.",
                needed_monthly
            ),
            json!({
                "goal_title": title,
                "progress": progress,
                "days_until_target": days_until_target,
                "remaining": remaining,
                "needed_monthly": needed_monthly,
            }),
        ));
    }

    alerts
}

//
// ================= Rule 7: Bills =================
//

fn overdue_bills(snapshot: &Snapshot, now: DateTime<Utc>) -> Vec<Alert> {
    let overdue: Vec<_> = snapshot
        .bills
        .iter()
        .filter(|b| !b.is_paid())
        .filter(|b| b.due_date.is_some_and(|due| due < now))
        .collect();

    if overdue.is_empty() {
        return Vec::new();
    }

    let total_amount: f64 = overdue.iter().map(|b| b.amount).sum();
    let names: Vec<String> = overdue.iter().map(|b| label(&b.bill_name, "Bill")).collect();

    vec![alert(
        AlertKind::OverdueBills,
        Severity::High,
        format!("{} overdue bill(s)", overdue.len()),
        format!(
            "${:.2} is past due: {}.",
            total_amount,
            names.join(", ")
        ),
        "Pay overdue bills as soon as possible to avoid late fees, and set up reminders or autopay.".to_string(),
        json!({
            "count": overdue.len(),
            "total_amount": total_amount,
            "bills": names,
        }),
    )]
}

//
// ================= Tests =================
//
