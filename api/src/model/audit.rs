use chrono::{DateTime, Utc};
use kernel::model::{audit::AuditLog, id::AuditLogId};
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogsResponse {
    pub items: Vec<AuditLogResponse>,
}

impl From<Vec<AuditLog>> for AuditLogsResponse {
    fn from(value: Vec<AuditLog>) -> Self {
        Self {
            items: value.into_iter().map(AuditLogResponse::from).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogResponse {
    pub audit_log_id: AuditLogId,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub actor: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditLog> for AuditLogResponse {
    fn from(value: AuditLog) -> Self {
        let AuditLog {
            audit_log_id,
            action,
            entity_type,
            entity_id,
            before,
            after,
            actor,
            reason,
            created_at,
        } = value;
        Self {
            audit_log_id,
            action,
            entity_type,
            entity_id,
            before,
            after,
            actor,
            reason,
            created_at,
        }
    }
}
