use serde::{Deserialize, Serialize};

use crate::pagination::PaginationQuery;

use super::GrantSource;

/// Privileged or cross-tenant action with immutable before/after snapshots.
/// Written through the must-succeed audit path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminAction {
    pub id: String,
    pub timestamp: i64,
    pub actor_id: String,
    pub actor_email: String,
    /// None for plain member actions routed through the privileged path
    /// (e.g. an ordinary organization switch).
    pub grant_source: Option<GrantSource>,
    pub action: String,
    pub target_type: String,
    pub target_id: String,
    /// Snapshot captured at action time, never re-derived later.
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub reason: Option<String>,
    pub org_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Ordinary tenant activity; written best-effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: String,
    pub timestamp: i64,
    pub actor_id: String,
    pub actor_email: String,
    pub action: String,
    pub target_type: String,
    pub target_id: String,
    pub org_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Admin-console audit listing filter.
#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub actor_id: Option<String>,
    pub action: Option<String>,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub org_id: Option<String>,
    pub from_timestamp: Option<i64>,
    pub to_timestamp: Option<i64>,
    #[serde(flatten)]
    pub pagination: PaginationQuery,
}

impl AuditQuery {
    pub fn limit(&self) -> i64 {
        self.pagination.limit()
    }

    pub fn offset(&self) -> i64 {
        self.pagination.offset()
    }
}
