use crate::model::slot::ReservedSlot;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::error::AppResult;

#[mockall::automock]
#[async_trait]
pub trait SlotRepository: Send + Sync {
    // 指定範囲に重なる HOLD / BOOKED のスロットを取得する。
    // 期限切れ判定は読み取り側（遅延失効）で行う
    async fn find_blocking_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<ReservedSlot>>;
}
