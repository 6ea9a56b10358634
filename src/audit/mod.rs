//! Audit trail writer, backed by its own database.
//!
//! Two streams with different guarantees:
//! - admin actions: must-succeed; a write failure aborts the caller's
//!   operation (callers run the write inside their primary-db transaction
//!   before committing).
//! - activity events: best-effort; failures are logged and swallowed.

use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use crate::db::DbPool;
use crate::db::from_row::{ACTIVITY_EVENT_COLS, ADMIN_ACTION_COLS, query_all};
use crate::error::{AppError, Result};
use crate::models::{ActivityEvent, AdminAction, AuditQuery, ClientInfo, GrantSource};
use crate::tenancy::Unscoped;

/// One privileged action to record.
pub struct AdminActionEntry<'a> {
    pub actor_id: &'a str,
    pub actor_email: &'a str,
    /// Set when the actor acted under platform-admin authority.
    pub grant_source: Option<GrantSource>,
    pub action: &'a str,
    pub target_type: &'a str,
    pub target_id: &'a str,
    pub before: Option<&'a serde_json::Value>,
    pub after: Option<&'a serde_json::Value>,
    pub reason: Option<&'a str>,
    pub org_id: Option<&'a str>,
    pub client: &'a ClientInfo,
}

/// One ordinary activity event to record.
pub struct ActivityEntry<'a> {
    pub actor_id: &'a str,
    pub actor_email: &'a str,
    pub action: &'a str,
    pub target_type: &'a str,
    pub target_id: &'a str,
    pub org_id: Option<&'a str>,
    pub details: Option<&'a serde_json::Value>,
    pub client: &'a ClientInfo,
}

#[derive(Clone)]
pub struct AuditWriter {
    pool: DbPool,
    enabled: bool,
}

impl AuditWriter {
    pub fn new(pool: DbPool, enabled: bool) -> Self {
        Self { pool, enabled }
    }

    /// Record a privileged action. Any failure surfaces as
    /// [`AppError::AuditWriteFailure`] so callers can abort the operation
    /// the record describes.
    pub fn record_admin_action(&self, entry: &AdminActionEntry<'_>) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let conn = self
            .pool
            .get()
            .map_err(|e| AppError::AuditWriteFailure(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let timestamp = Utc::now().timestamp();
        let before = entry.before.map(|v| v.to_string());
        let after = entry.after.map(|v| v.to_string());

        conn.execute(
            "INSERT INTO admin_actions (id, timestamp, actor_id, actor_email, grant_source, action, target_type, target_id, before_state, after_state, reason, org_id, ip_address, user_agent)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                &id,
                timestamp,
                entry.actor_id,
                entry.actor_email,
                entry.grant_source.map(|s| s.as_ref().to_string()),
                entry.action,
                entry.target_type,
                entry.target_id,
                &before,
                &after,
                entry.reason,
                entry.org_id,
                &entry.client.ip_address,
                &entry.client.user_agent
            ],
        )
        .map_err(|e| AppError::AuditWriteFailure(e.to_string()))?;

        Ok(())
    }

    /// Record an activity event. Failures are logged, never propagated.
    pub fn record_activity(&self, entry: &ActivityEntry<'_>) {
        if !self.enabled {
            return;
        }
        if let Err(e) = self.try_record_activity(entry) {
            tracing::warn!(
                error = %e,
                action = %entry.action,
                target = %entry.target_id,
                "Failed to record activity event"
            );
        }
    }

    fn try_record_activity(&self, entry: &ActivityEntry<'_>) -> Result<()> {
        let conn = self.pool.get()?;
        let id = Uuid::new_v4().to_string();
        let timestamp = Utc::now().timestamp();
        let details = entry.details.map(|v| v.to_string());

        conn.execute(
            "INSERT INTO activity_events (id, timestamp, actor_id, actor_email, action, target_type, target_id, org_id, details, ip_address, user_agent)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                &id,
                timestamp,
                entry.actor_id,
                entry.actor_email,
                entry.action,
                entry.target_type,
                entry.target_id,
                entry.org_id,
                &details,
                &entry.client.ip_address,
                &entry.client.user_agent
            ],
        )?;
        Ok(())
    }

    pub fn query_admin_actions(
        &self,
        _access: &Unscoped,
        query: &AuditQuery,
    ) -> Result<(Vec<AdminAction>, i64)> {
        let conn = self.pool.get()?;
        let (where_clause, mut filter_params) = build_where(query);

        let count_sql = format!("SELECT COUNT(*) FROM admin_actions {}", where_clause);
        let filter_refs: Vec<&dyn rusqlite::ToSql> =
            filter_params.iter().map(|b| b.as_ref()).collect();
        let total: i64 = conn.query_row(&count_sql, filter_refs.as_slice(), |row| row.get(0))?;

        let select_sql = format!(
            "SELECT {} FROM admin_actions {} ORDER BY timestamp DESC LIMIT ? OFFSET ?",
            ADMIN_ACTION_COLS, where_clause
        );
        filter_params.push(Box::new(query.limit()));
        filter_params.push(Box::new(query.offset()));
        let select_refs: Vec<&dyn rusqlite::ToSql> =
            filter_params.iter().map(|b| b.as_ref()).collect();

        let items = query_all(&conn, &select_sql, select_refs.as_slice())?;
        Ok((items, total))
    }

    pub fn query_activity(
        &self,
        _access: &Unscoped,
        query: &AuditQuery,
    ) -> Result<(Vec<ActivityEvent>, i64)> {
        let conn = self.pool.get()?;
        let (where_clause, mut filter_params) = build_where(query);

        let count_sql = format!("SELECT COUNT(*) FROM activity_events {}", where_clause);
        let filter_refs: Vec<&dyn rusqlite::ToSql> =
            filter_params.iter().map(|b| b.as_ref()).collect();
        let total: i64 = conn.query_row(&count_sql, filter_refs.as_slice(), |row| row.get(0))?;

        let select_sql = format!(
            "SELECT {} FROM activity_events {} ORDER BY timestamp DESC LIMIT ? OFFSET ?",
            ACTIVITY_EVENT_COLS, where_clause
        );
        filter_params.push(Box::new(query.limit()));
        filter_params.push(Box::new(query.offset()));
        let select_refs: Vec<&dyn rusqlite::ToSql> =
            filter_params.iter().map(|b| b.as_ref()).collect();

        let items = query_all(&conn, &select_sql, select_refs.as_slice())?;
        Ok((items, total))
    }

    /// Remove a user's rows from both streams: entries they acted in, and
    /// admin actions that targeted them. Part of account deletion; runs
    /// after the deletion itself has been recorded, and that final
    /// `user.delete` record is the one entry left standing.
    pub fn purge_actor_trails(&self, user_id: &str) -> Result<(usize, usize)> {
        let conn = self.pool.get()?;
        let mut admin = conn.execute(
            "DELETE FROM admin_actions WHERE actor_id = ?1",
            params![user_id],
        )?;
        admin += conn.execute(
            "DELETE FROM admin_actions
             WHERE target_type = 'user' AND target_id = ?1 AND action != 'user.delete'",
            params![user_id],
        )?;
        let activity = conn.execute(
            "DELETE FROM activity_events WHERE actor_id = ?1",
            params![user_id],
        )?;
        Ok((admin, activity))
    }

    /// Retention purge. Admin actions are kept forever; only activity
    /// events age out.
    pub fn purge_expired(&self, retention_days: i64) -> Result<usize> {
        let conn = self.pool.get()?;
        let cutoff = Utc::now().timestamp() - retention_days * 24 * 60 * 60;
        let purged = conn.execute(
            "DELETE FROM activity_events WHERE timestamp < ?1",
            params![cutoff],
        )?;
        Ok(purged)
    }
}

fn build_where(query: &AuditQuery) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
    let mut where_clause = String::from("WHERE 1=1");
    let mut filter_params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(ref actor_id) = query.actor_id {
        where_clause.push_str(" AND actor_id = ?");
        filter_params.push(Box::new(actor_id.clone()));
    }
    if let Some(ref action) = query.action {
        where_clause.push_str(" AND action = ?");
        filter_params.push(Box::new(action.clone()));
    }
    if let Some(ref target_type) = query.target_type {
        where_clause.push_str(" AND target_type = ?");
        filter_params.push(Box::new(target_type.clone()));
    }
    if let Some(ref target_id) = query.target_id {
        where_clause.push_str(" AND target_id = ?");
        filter_params.push(Box::new(target_id.clone()));
    }
    if let Some(ref org_id) = query.org_id {
        where_clause.push_str(" AND org_id = ?");
        filter_params.push(Box::new(org_id.clone()));
    }
    if let Some(from_ts) = query.from_timestamp {
        where_clause.push_str(" AND timestamp >= ?");
        filter_params.push(Box::new(from_ts));
    }
    if let Some(to_ts) = query.to_timestamp {
        where_clause.push_str(" AND timestamp <= ?");
        filter_params.push(Box::new(to_ts));
    }

    (where_clause, filter_params)
}
