use crate::database::{model::slot::ReservedSlotRow, ConnectionPool};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_new::new;
use kernel::model::slot::ReservedSlot;
use kernel::repository::slot::SlotRepository;
use shared::error::{AppError, AppResult};

#[derive(new)]
pub struct SlotRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl SlotRepository for SlotRepositoryImpl {
    // 空き状況計算の入力になるスロット群。
    // 重なり条件は existing.start < range.end AND range.start < existing.end
    async fn find_blocking_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<ReservedSlot>> {
        let rows: Vec<ReservedSlotRow> = sqlx::query_as(
            r#"
                SELECT slot_id, resource_id, order_id, start_time, end_time, status, expires_at
                FROM reserved_slots
                WHERE status IN ('HOLD', 'BOOKED')
                  AND start_time < $2
                  AND $1 < end_time
                ORDER BY start_time ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(rows.into_iter().map(ReservedSlot::from).collect())
    }
}
