use kernel::model::{
    id::{OrderId, ResourceId, SlotId},
    slot::{ReservedSlot, SlotStatus},
};
use sqlx::types::chrono::{DateTime, Utc};

#[derive(sqlx::FromRow)]
pub struct ReservedSlotRow {
    pub slot_id: SlotId,
    pub resource_id: ResourceId,
    pub order_id: OrderId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SlotStatus,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<ReservedSlotRow> for ReservedSlot {
    fn from(value: ReservedSlotRow) -> Self {
        let ReservedSlotRow {
            slot_id,
            resource_id,
            order_id,
            start_time,
            end_time,
            status,
            expires_at,
        } = value;
        ReservedSlot {
            slot_id,
            resource_id,
            order_id,
            start_time,
            end_time,
            status,
            expires_at,
        }
    }
}
