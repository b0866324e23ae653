use crate::database::{model::audit::AuditLogRow, ConnectionPool};
use async_trait::async_trait;
use derive_new::new;
use kernel::model::audit::AuditLog;
use kernel::repository::audit::AuditLogRepository;
use shared::error::{AppError, AppResult};

#[derive(new)]
pub struct AuditLogRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl AuditLogRepository for AuditLogRepositoryImpl {
    async fn find_by_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> AppResult<Vec<AuditLog>> {
        let rows: Vec<AuditLogRow> = sqlx::query_as(
            r#"
                SELECT audit_log_id, action, entity_type, entity_id,
                       before_state, after_state, actor, reason, created_at
                FROM audit_logs
                WHERE entity_type = $1 AND entity_id = $2
                ORDER BY created_at ASC
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(rows.into_iter().map(AuditLog::from).collect())
    }
}
