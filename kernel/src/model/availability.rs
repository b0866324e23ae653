use crate::model::id::ResourceId;
use crate::model::resource::{Resource, ResourceType};
use crate::model::slot::{ReservedSlot, SlotStatus};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use shared::error::{AppError, AppResult};

// 空き状況の 1 区画の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotAvailability {
    Available,
    Hold,
    Booked,
}

#[derive(Debug)]
pub struct AvailabilitySlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SlotAvailability,
}

#[derive(Debug)]
pub struct ResourceAvailability {
    pub resource_id: ResourceId,
    pub resource_name: String,
    pub resource_type: ResourceType,
    pub slots: Vec<AvailabilitySlot>,
}

#[derive(Debug)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub resources: Vec<ResourceAvailability>,
}

// 営業時間を区切り幅ごとの区画に分割し、各区画の状態を導出する。
// 副作用なし。判定はスロットの blocks_at / overlaps に一本化し、
// 書き込み側の衝突チェックと見え方が食い違わないようにする
pub fn build_day_availability(
    date: NaiveDate,
    resources: &[Resource],
    slots: &[ReservedSlot],
    hours: Option<(NaiveTime, NaiveTime)>,
    interval_minutes: u32,
    now: DateTime<Utc>,
) -> DayAvailability {
    // 休業日は空のリソース一覧を返す（エラーにはしない）
    let Some((open, close)) = hours else {
        return DayAvailability {
            date,
            resources: vec![],
        };
    };

    let day_open = date.and_time(open).and_utc();
    let day_close = date.and_time(close).and_utc();
    let step = Duration::minutes(i64::from(interval_minutes));

    let resources = resources
        .iter()
        .map(|resource| {
            let mut buckets = Vec::new();
            let mut cursor = day_open;
            while cursor < day_close {
                let bucket_end = (cursor + step).min(day_close);
                let status = bucket_status(resource.resource_id, slots, cursor, bucket_end, now);
                buckets.push(AvailabilitySlot {
                    start_time: cursor,
                    end_time: bucket_end,
                    status,
                });
                cursor = bucket_end;
            }
            ResourceAvailability {
                resource_id: resource.resource_id,
                resource_name: resource.resource_name.clone(),
                resource_type: resource.resource_type,
                slots: buckets,
            }
        })
        .collect();

    DayAvailability { date, resources }
}

// 区画の状態判定。BOOKED が HOLD より優先される
fn bucket_status(
    resource_id: ResourceId,
    slots: &[ReservedSlot],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> SlotAvailability {
    let mut held = false;
    for slot in slots {
        if slot.resource_id != resource_id || !slot.overlaps(start, end) || !slot.blocks_at(now) {
            continue;
        }
        match slot.status {
            SlotStatus::Booked => return SlotAvailability::Booked,
            SlotStatus::Hold => held = true,
            SlotStatus::Released => {}
        }
    }
    if held {
        SlotAvailability::Hold
    } else {
        SlotAvailability::Available
    }
}

// ホールド要求の時間帯が営業時間内に収まり、区切り幅に揃っていて、
// 過去でないことを検証する。書き込み前に必ず通すこと
pub fn validate_booking_window(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    hours: Option<(NaiveTime, NaiveTime)>,
    interval_minutes: u32,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let Some((open, close)) = hours else {
        return Err(AppError::UnprocessableEntity(
            "指定日は休業日のため予約できません".into(),
        ));
    };

    if end <= start {
        return Err(AppError::InvalidDuration(
            "終了時刻は開始時刻より後である必要があります".into(),
        ));
    }
    if start < now {
        return Err(AppError::UnprocessableEntity(
            "過去の時間帯は予約できません".into(),
        ));
    }

    let date = start.date_naive();
    let day_open = date.and_time(open).and_utc();
    let day_close = date.and_time(close).and_utc();
    if start < day_open || end > day_close {
        return Err(AppError::UnprocessableEntity(
            "営業時間外の時間帯は予約できません".into(),
        ));
    }

    let offset = (start - day_open).num_minutes();
    if offset % i64::from(interval_minutes) != 0 {
        return Err(AppError::UnprocessableEntity(format!(
            "開始時刻は {interval_minutes} 分区切りで指定してください"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::id::{OrderId, SlotId};
    use chrono::TimeZone;

    fn lane(name: &str) -> Resource {
        Resource {
            resource_id: ResourceId::new(),
            resource_name: name.into(),
            resource_type: ResourceType::BowlingLane,
            capacity: 6,
            price_override: None,
            is_active: true,
        }
    }

    fn slot_for(
        resource_id: ResourceId,
        start_h: u32,
        end_h: u32,
        status: SlotStatus,
        expires_at: Option<DateTime<Utc>>,
    ) -> ReservedSlot {
        ReservedSlot {
            slot_id: SlotId::new(),
            resource_id,
            order_id: OrderId::new(),
            start_time: Utc.with_ymd_and_hms(2025, 6, 1, start_h, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2025, 6, 1, end_h, 0, 0).unwrap(),
            status,
            expires_at,
        }
    }

    fn hours() -> Option<(NaiveTime, NaiveTime)> {
        Some((
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
        ))
    }

    #[test]
    fn test_booked_window_is_never_reported_available() {
        let resource = lane("レーン1");
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let slots = vec![slot_for(resource.resource_id, 14, 16, SlotStatus::Booked, None)];

        let day = build_day_availability(date, &[resource], &slots, hours(), 60, now);
        let buckets = &day.resources[0].slots;
        // 10:00 始まりの 60 分区切りなので 14:00 は 5 番目
        assert_eq!(buckets[4].status, SlotAvailability::Booked);
        assert_eq!(buckets[5].status, SlotAvailability::Booked);
        assert_eq!(buckets[3].status, SlotAvailability::Available);
        assert_eq!(buckets[6].status, SlotAvailability::Available);
    }

    #[test]
    fn test_expired_hold_is_reported_available() {
        let resource = lane("レーン1");
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 13, 30, 0).unwrap();
        // スイーパー未実行の期限切れホールド
        let expired = Utc.with_ymd_and_hms(2025, 6, 1, 13, 0, 0).unwrap();
        let slots = vec![slot_for(
            resource.resource_id,
            14,
            16,
            SlotStatus::Hold,
            Some(expired),
        )];

        let day = build_day_availability(date, &[resource], &slots, hours(), 60, now);
        assert!(day.resources[0]
            .slots
            .iter()
            .all(|bucket| bucket.status == SlotAvailability::Available));
    }

    #[test]
    fn test_live_hold_is_reported_held() {
        let resource = lane("レーン1");
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 13, 30, 0).unwrap();
        let expires = Utc.with_ymd_and_hms(2025, 6, 1, 13, 45, 0).unwrap();
        let slots = vec![slot_for(
            resource.resource_id,
            14,
            16,
            SlotStatus::Hold,
            Some(expires),
        )];

        let day = build_day_availability(date, &[resource], &slots, hours(), 60, now);
        assert_eq!(day.resources[0].slots[4].status, SlotAvailability::Hold);
    }

    #[test]
    fn test_closed_day_yields_empty_resource_list() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let day = build_day_availability(date, &[lane("レーン1")], &[], None, 60, now);
        assert!(day.resources.is_empty());
    }

    #[test]
    fn test_validate_booking_window() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let t = |h: u32, m: u32| Utc.with_ymd_and_hms(2025, 6, 1, h, m, 0).unwrap();

        assert!(validate_booking_window(t(14, 0), t(16, 0), hours(), 60, now).is_ok());
        // 営業時間外
        assert!(validate_booking_window(t(9, 0), t(11, 0), hours(), 60, now).is_err());
        assert!(validate_booking_window(t(21, 0), t(23, 0), hours(), 60, now).is_err());
        // 区切り幅に揃っていない
        assert!(validate_booking_window(t(14, 30), t(15, 30), hours(), 60, now).is_err());
        // 休業日
        assert!(validate_booking_window(t(14, 0), t(16, 0), None, 60, now).is_err());
        // 開始と終了が逆
        assert!(validate_booking_window(t(16, 0), t(14, 0), hours(), 60, now).is_err());
    }
}
