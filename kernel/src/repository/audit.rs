use crate::model::audit::AuditLog;
use async_trait::async_trait;
use shared::error::AppResult;

// 監査ログの読み取り口。書き込みは各遷移と同一トランザクションで
// 行う必要があるため、アダプタ内部のヘルパが担う
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn find_by_entity(&self, entity_type: &str, entity_id: &str)
        -> AppResult<Vec<AuditLog>>;
}
