use kernel::model::{audit::AuditLog, id::AuditLogId};
use sqlx::types::chrono::{DateTime, Utc};

#[derive(sqlx::FromRow)]
pub struct AuditLogRow {
    pub audit_log_id: AuditLogId,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub before_state: Option<serde_json::Value>,
    pub after_state: Option<serde_json::Value>,
    pub actor: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditLogRow> for AuditLog {
    fn from(value: AuditLogRow) -> Self {
        let AuditLogRow {
            audit_log_id,
            action,
            entity_type,
            entity_id,
            before_state,
            after_state,
            actor,
            reason,
            created_at,
        } = value;
        AuditLog {
            audit_log_id,
            action,
            entity_type,
            entity_id,
            before: before_state,
            after: after_state,
            actor,
            reason,
            created_at,
        }
    }
}
