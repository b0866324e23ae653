use crate::model::id::{OrderId, ResourceId, SlotId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{AsRefStr, EnumString};

// 時間枠確保の状態。
// HOLD は決済待ちの仮確保、BOOKED は決済確定後の本確保
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr, EnumString, sqlx::Type,
)]
#[sqlx(type_name = "slot_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotStatus {
    Hold,
    Booked,
    Released,
}

// 設備×時間帯の割当を表す唯一の単位。
// 空き判定はすべてこのレコード群に対する同一の重なり判定を通す
#[derive(Debug, Clone)]
pub struct ReservedSlot {
    pub slot_id: SlotId,
    pub resource_id: ResourceId,
    pub order_id: OrderId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SlotStatus,
    // HOLD の間だけ設定される。現地決済のホールドには期限を付けない
    pub expires_at: Option<DateTime<Utc>>,
}

impl ReservedSlot {
    // [start, end) の半開区間同士の重なり判定
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && start < self.end_time
    }

    // 読み取り時点でこの枠が他者の予約を妨げるかどうか。
    // 期限切れの HOLD はスイーパーが未実行でも空きとして扱う（遅延失効）
    pub fn blocks_at(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            SlotStatus::Booked => true,
            SlotStatus::Hold => self.expires_at.map_or(true, |expires| expires > now),
            SlotStatus::Released => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::id::{OrderId, ResourceId, SlotId};
    use chrono::TimeZone;

    fn slot(status: SlotStatus, expires_at: Option<DateTime<Utc>>) -> ReservedSlot {
        ReservedSlot {
            slot_id: SlotId::new(),
            resource_id: ResourceId::new(),
            order_id: OrderId::new(),
            start_time: Utc.with_ymd_and_hms(2025, 6, 1, 14, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2025, 6, 1, 16, 0, 0).unwrap(),
            status,
            expires_at,
        }
    }

    #[test]
    fn test_expired_hold_does_not_block() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 13, 0, 0).unwrap();
        let expired = slot(
            SlotStatus::Hold,
            Some(Utc.with_ymd_and_hms(2025, 6, 1, 12, 59, 0).unwrap()),
        );
        let live = slot(
            SlotStatus::Hold,
            Some(Utc.with_ymd_and_hms(2025, 6, 1, 13, 10, 0).unwrap()),
        );
        let onsite = slot(SlotStatus::Hold, None);

        assert!(!expired.blocks_at(now));
        assert!(live.blocks_at(now));
        // 現地決済のホールドは期限切れにならない
        assert!(onsite.blocks_at(now));
        assert!(slot(SlotStatus::Booked, None).blocks_at(now));
        assert!(!slot(SlotStatus::Released, None).blocks_at(now));
    }

    #[test]
    fn test_overlaps_is_half_open() {
        let s = slot(SlotStatus::Booked, None);
        let t = |h: u32| Utc.with_ymd_and_hms(2025, 6, 1, h, 0, 0).unwrap();

        assert!(s.overlaps(t(15), t(17)));
        assert!(s.overlaps(t(13), t(15)));
        // 終端と始端がちょうど接する場合は重ならない
        assert!(!s.overlaps(t(16), t(18)));
        assert!(!s.overlaps(t(12), t(14)));
    }
}
