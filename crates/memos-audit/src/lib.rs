//! Audit Log (C2): an append-only event record. Every authorization
//! decision, mutation, and failure writes one row here (§2, §4.1).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use memos_core::{OrganizationId, TenantContext, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub organization_id: OrganizationId,
    pub actor_user_id: Option<UserId>,
    pub event_type: String,
    pub severity: Severity,
    pub resource_type: Option<String>,
    pub resource_id: Option<Uuid>,
    pub details: Value,
    pub trace_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(ctx: &TenantContext, event_type: impl Into<String>, details: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id: ctx.organization_id,
            actor_user_id: ctx.actor.user_id(),
            event_type: event_type.into(),
            severity: Severity::Info,
            resource_type: None,
            resource_id: None,
            details,
            trace_id: ctx.trace_id,
            created_at: Utc::now(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn on_resource(mut self, resource_type: impl Into<String>, resource_id: Uuid) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit sink unavailable: {0}")]
    SinkUnavailable(String),
}

/// Durable sink for audit events. The Postgres-backed implementation is an
/// external collaborator (§1); this trait is the contract a request handler
/// or worker writes against.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError>;

    async fn list_recent(
        &self,
        organization_id: OrganizationId,
        limit: usize,
    ) -> Result<Vec<AuditEvent>, AuditError>;
}

/// In-memory sink used by tests and as the default before a database pool is
/// wired in. Never used in place of the durable sink in production: audit
/// writes must survive a process restart.
#[derive(Default)]
pub struct InMemoryAuditSink {
    events: parking_lot::Mutex<Vec<AuditEvent>>,
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        tracing::info!(
            event_type = %event.event_type,
            organization_id = %event.organization_id,
            severity = ?event.severity,
            "audit event recorded"
        );
        self.events.lock().push(event);
        Ok(())
    }

    async fn list_recent(
        &self,
        organization_id: OrganizationId,
        limit: usize,
    ) -> Result<Vec<AuditEvent>, AuditError> {
        let events = self.events.lock();
        Ok(events
            .iter()
            .rev()
            .filter(|e| e.organization_id == organization_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memos_core::TenantContext;
    use serde_json::json;

    fn ctx() -> TenantContext {
        TenantContext::for_user(Uuid::new_v4(), Uuid::new_v4(), vec!["member".into()], 0)
    }

    #[tokio::test]
    async fn records_are_scoped_to_organization() {
        let sink = InMemoryAuditSink::default();
        let ctx_a = ctx();
        let ctx_b = ctx();

        sink.record(AuditEvent::new(&ctx_a, "memory.create", json!({})))
            .await
            .unwrap();
        sink.record(AuditEvent::new(&ctx_b, "memory.create", json!({})))
            .await
            .unwrap();

        let a_events = sink.list_recent(ctx_a.organization_id, 10).await.unwrap();
        assert_eq!(a_events.len(), 1);
        assert_eq!(a_events[0].organization_id, ctx_a.organization_id);
    }

    #[tokio::test]
    async fn list_recent_respects_limit_and_order() {
        let sink = InMemoryAuditSink::default();
        let ctx = ctx();
        for i in 0..5 {
            sink.record(AuditEvent::new(&ctx, format!("event.{i}"), json!({})))
                .await
                .unwrap();
        }
        let recent = sink.list_recent(ctx.organization_id, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].event_type, "event.4");
    }
}
