//! Entity store access layer
//!
//! Read-only view of the hosted entity store: caller identity plus the six
//! per-user collections the monitor needs.

use crate::models::Caller;
use crate::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod http;
pub use http::HttpEntityStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Budget,
    Investment,
    BudgetTransaction,
    Subscription,
    BillPayment,
    FinancialGoal,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Budget,
        EntityKind::Investment,
        EntityKind::BudgetTransaction,
        EntityKind::Subscription,
        EntityKind::BillPayment,
        EntityKind::FinancialGoal,
    ];

    /// Collection name on the hosted platform
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Budget => "Budget",
            EntityKind::Investment => "Investment",
            EntityKind::BudgetTransaction => "BudgetTransaction",
            EntityKind::Subscription => "Subscription",
            EntityKind::BillPayment => "BillPayment",
            EntityKind::FinancialGoal => "FinancialGoal",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for reading the caller's records
#[async_trait::async_trait]
pub trait EntityStore: Send + Sync {
    async fn list(&self, kind: EntityKind, caller: &Caller) -> Result<Vec<Value>>;
}

/// Trait for resolving a bearer token to a caller
#[async_trait::async_trait]
pub trait IdentityResolver: Send + Sync {
    /// `Ok(None)` when the token does not identify anyone
    async fn resolve(&self, access_token: &str) -> Result<Option<Caller>>;
}

/// In-memory entity store for development and tests
pub struct InMemoryEntityStore {
    callers_by_token: Arc<RwLock<HashMap<String, Caller>>>,
    records: Arc<RwLock<HashMap<(String, EntityKind), Vec<Value>>>>, // (user_id, kind) → records
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self {
            callers_by_token: Arc::new(RwLock::new(HashMap::new())),
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a caller under a token and return the resolved identity
    pub async fn register_caller(&self, access_token: &str, id: &str, email: &str) -> Caller {
        let caller = Caller {
            id: id.to_string(),
            email: email.to_string(),
            access_token: access_token.to_string(),
        };

        let mut callers = self.callers_by_token.write().await;
        callers.insert(access_token.to_string(), caller.clone());
        caller
    }

    pub async fn insert(&self, user_id: &str, kind: EntityKind, record: Value) {
        let mut records = self.records.write().await;
        records
            .entry((user_id.to_string(), kind))
            .or_insert_with(Vec::new)
            .push(record);
    }
}

impl Default for InMemoryEntityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn list(&self, kind: EntityKind, caller: &Caller) -> Result<Vec<Value>> {
        let records = self.records.read().await;

        Ok(records
            .get(&(caller.id.clone(), kind))
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl IdentityResolver for InMemoryEntityStore {
    async fn resolve(&self, access_token: &str) -> Result<Option<Caller>> {
        let callers = self.callers_by_token.read().await;
        Ok(callers.get(access_token).cloned())
    }
}
